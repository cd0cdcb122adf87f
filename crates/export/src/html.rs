// HTML clipboard format
//
// A bare `<table>` with thead/tbody sections, one line per tag group.
// Minimal markup on purpose: paste targets apply their own styling.

use crate::context::ExportContext;

pub fn render(ctx: &ExportContext) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push("<table>".to_string());

    if ctx.include_header {
        lines.push("<thead>".to_string());
        let cells: String = ctx
            .headers
            .iter()
            .map(|h| format!("<th>{}</th>", escape(h)))
            .collect();
        lines.push(format!("<tr>{}</tr>", cells));
        lines.push("</thead>".to_string());
    }

    lines.push("<tbody>".to_string());
    for row in &ctx.rows {
        let cells: String = row
            .iter()
            .map(|v| format!("<td>{}</td>", escape(&v.display())))
            .collect();
        lines.push(format!("<tr>{}</tr>", cells));
    }
    lines.push("</tbody>".to_string());
    lines.push("</table>".to_string());

    lines.join("\n")
}

/// Escape the five HTML-significant characters.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{sample_context, ExportContext};
    use gridkit_core::value::Value;

    #[test]
    fn test_html_golden() {
        let expected = "<table>\n\
            <thead>\n\
            <tr><th>Name</th><th>Value</th></tr>\n\
            </thead>\n\
            <tbody>\n\
            <tr><td>Alpha</td><td>1</td></tr>\n\
            <tr><td>Beta</td><td>2</td></tr>\n\
            </tbody>\n\
            </table>";
        assert_eq!(render(&sample_context()), expected);
    }

    #[test]
    fn test_html_without_header_has_no_thead() {
        let mut ctx = sample_context();
        ctx.include_header = false;
        let out = render(&ctx);
        assert!(!out.contains("<thead>"));
        assert!(out.contains("<tbody>"));
    }

    #[test]
    fn test_html_escapes_markup() {
        let ctx = ExportContext::new(
            vec!["A".into()],
            vec![vec![Value::Text("<b>&\"x\"</b>".into())]],
            false,
        );
        assert!(render(&ctx).contains("&lt;b&gt;&amp;&quot;x&quot;&lt;/b&gt;"));
    }
}
