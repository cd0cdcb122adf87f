// JSON clipboard format
//
// With a header: an array of objects keyed by column header, preserving
// column order (objects are built by hand; serde_json maps would sort keys).
// Without: an array of arrays. Compact, no trailing newline.

use gridkit_core::value::Value;

use crate::context::ExportContext;

pub fn render(ctx: &ExportContext) -> String {
    let mut out = String::from("[");

    for (i, row) in ctx.rows.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if ctx.include_header {
            out.push('{');
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    out.push(',');
                }
                out.push_str(&json_string(&ctx.headers[j]));
                out.push(':');
                out.push_str(&json_value(value));
            }
            out.push('}');
        } else {
            out.push('[');
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    out.push(',');
                }
                out.push_str(&json_value(value));
            }
            out.push(']');
        }
    }

    out.push(']');
    out
}

fn json_value(value: &Value) -> String {
    match value {
        Value::Empty => "null".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Number(n) if n.is_finite() => {
            // serde_json's number formatting (integers without .0)
            serde_json::Number::from_f64(*n)
                .map(|num| num.to_string())
                .unwrap_or_else(|| "null".to_string())
        }
        // NaN/infinity have no JSON representation
        Value::Number(_) => "null".to_string(),
        other => json_string(&other.display()),
    }
}

fn json_string(s: &str) -> String {
    // serde_json handles escaping; a bare &str always serializes
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{sample_context, ExportContext};

    #[test]
    fn test_json_golden() {
        let expected = r#"[{"Name":"Alpha","Value":1.0},{"Name":"Beta","Value":2.0}]"#;
        assert_eq!(render(&sample_context()), expected);
    }

    #[test]
    fn test_json_without_header_arrays() {
        let mut ctx = sample_context();
        ctx.include_header = false;
        assert_eq!(render(&ctx), r#"[["Alpha",1.0],["Beta",2.0]]"#);
    }

    #[test]
    fn test_json_preserves_column_order() {
        let ctx = ExportContext::new(
            vec!["Zebra".into(), "Apple".into()],
            vec![vec![Value::Number(1.0), Value::Number(2.0)]],
            true,
        );
        assert_eq!(render(&ctx), r#"[{"Zebra":1.0,"Apple":2.0}]"#);
    }

    #[test]
    fn test_json_escapes_and_nulls() {
        let ctx = ExportContext::new(
            vec!["A".into(), "B".into()],
            vec![vec![Value::Text("say \"hi\"".into()), Value::Empty]],
            true,
        );
        assert_eq!(render(&ctx), r#"[{"A":"say \"hi\"","B":null}]"#);
    }

    #[test]
    fn test_json_empty_selection() {
        let ctx = ExportContext::new(vec![], vec![], true);
        assert_eq!(render(&ctx), "[]");
    }
}
