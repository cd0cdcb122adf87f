// YAML clipboard format
//
// With a header: a sequence of maps keyed by column header.
// Without: a sequence of sequences. Two-space indent, block style.
// Scalars are double-quoted only when a plain scalar would be ambiguous.

use gridkit_core::value::Value;

use crate::context::ExportContext;

pub fn render(ctx: &ExportContext) -> String {
    let mut lines: Vec<String> = Vec::new();

    for row in &ctx.rows {
        if ctx.include_header {
            for (i, value) in row.iter().enumerate() {
                let prefix = if i == 0 { "- " } else { "  " };
                lines.push(format!(
                    "{}{}: {}",
                    prefix,
                    scalar(&ctx.headers[i]),
                    value_scalar(value)
                ));
            }
        } else {
            for (i, value) in row.iter().enumerate() {
                let prefix = if i == 0 { "- - " } else { "  - " };
                lines.push(format!("{}{}", prefix, value_scalar(value)));
            }
        }
    }

    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

fn value_scalar(value: &Value) -> String {
    match value {
        // YAML null for empty cells keeps columns distinguishable from ""
        Value::Empty => "null".to_string(),
        Value::Number(_) | Value::Boolean(_) => value.display(),
        Value::DateTime(_) => quote(&value.display()),
        Value::Text(s) => scalar(s),
    }
}

/// Emit a string as a plain scalar when safe, double-quoted otherwise.
fn scalar(s: &str) -> String {
    if needs_quote(s) {
        quote(s)
    } else {
        s.to_string()
    }
}

fn needs_quote(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    if s.trim() != s {
        return true;
    }
    // Plain scalars must not parse as another YAML type
    if s.parse::<f64>().is_ok() {
        return true;
    }
    if matches!(s, "true" | "false" | "null" | "~" | "yes" | "no") {
        return true;
    }
    s.chars().any(|c| {
        matches!(
            c,
            ':' | '#' | '-' | '[' | ']' | '{' | '}' | ',' | '&' | '*' | '?' | '|' | '>' | '!'
                | '%' | '@' | '`' | '"' | '\'' | '\n' | '\\'
        )
    })
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{sample_context, ExportContext};

    #[test]
    fn test_yaml_golden() {
        let expected = "- Name: Alpha\n  Value: 1\n- Name: Beta\n  Value: 2\n";
        assert_eq!(render(&sample_context()), expected);
    }

    #[test]
    fn test_yaml_without_header_nested_sequences() {
        let mut ctx = sample_context();
        ctx.include_header = false;
        assert_eq!(render(&ctx), "- - Alpha\n  - 1\n- - Beta\n  - 2\n");
    }

    #[test]
    fn test_yaml_quotes_ambiguous_text() {
        let ctx = ExportContext::new(
            vec!["A".into(), "B".into(), "C".into()],
            vec![vec![
                Value::Text("123".into()),
                Value::Text("has: colon".into()),
                Value::Text("true".into()),
            ]],
            true,
        );
        let out = render(&ctx);
        assert!(out.contains("A: \"123\""));
        assert!(out.contains("B: \"has: colon\""));
        assert!(out.contains("C: \"true\""));
    }

    #[test]
    fn test_yaml_empty_cell_is_null() {
        let ctx = ExportContext::new(
            vec!["A".into()],
            vec![vec![Value::Empty]],
            true,
        );
        assert_eq!(render(&ctx), "- A: null\n");
    }

    #[test]
    fn test_yaml_empty_selection() {
        let ctx = ExportContext::new(vec!["A".into()], vec![], true);
        assert_eq!(render(&ctx), "");
    }
}
