// Markdown clipboard format
//
// A pipe table: header row, `| --- |` separator, one line per data row.
// Pipes and backslashes in cell text are escaped. Without a header row the
// separator is omitted (the output degrades to pipe-delimited lines).

use crate::context::ExportContext;

pub fn render(ctx: &ExportContext) -> String {
    let mut lines: Vec<String> = Vec::new();

    if ctx.include_header {
        lines.push(pipe_row(ctx.headers.iter().map(|h| escape(h))));
        lines.push(pipe_row(ctx.headers.iter().map(|_| "---".to_string())));
    }
    for row in &ctx.rows {
        lines.push(pipe_row(row.iter().map(|v| escape(&v.display()))));
    }

    lines.join("\n")
}

fn pipe_row(cells: impl Iterator<Item = String>) -> String {
    let mut out = String::from("|");
    for cell in cells {
        out.push(' ');
        out.push_str(&cell);
        out.push_str(" |");
    }
    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '|' => out.push_str("\\|"),
            '\\' => out.push_str("\\\\"),
            // Markdown tables cannot hold literal newlines
            '\n' => out.push_str("<br>"),
            '\r' => {}
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
    fn test_markdown_golden() {
        let expected = "| Name | Value |\n| --- | --- |\n| Alpha | 1 |\n| Beta | 2 |";
        assert_eq!(render(&sample_context()), expected);
    }

    #[test]
    fn test_markdown_without_header_omits_separator() {
        let mut ctx = sample_context();
        ctx.include_header = false;
        assert_eq!(render(&ctx), "| Alpha | 1 |\n| Beta | 2 |");
    }

    #[test]
    fn test_markdown_escapes_pipe() {
        let ctx = ExportContext::new(
            vec!["A".into()],
            vec![vec![Value::Text("a|b".into())]],
            false,
        );
        assert_eq!(render(&ctx), "| a\\|b |");
    }

    #[test]
    fn test_markdown_newline_becomes_br() {
        let ctx = ExportContext::new(
            vec!["A".into()],
            vec![vec![Value::Text("x\ny".into())]],
            false,
        );
        assert_eq!(render(&ctx), "| x<br>y |");
    }
}
