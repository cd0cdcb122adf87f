// Plain-text clipboard format
//
// Tab-separated fields, `\n` between rows, no trailing newline. This is the
// shape spreadsheet applications expect when pasting a block of cells.

use crate::context::ExportContext;

pub fn render(ctx: &ExportContext) -> String {
    let mut lines: Vec<String> = Vec::new();

    if ctx.include_header {
        lines.push(ctx.headers.join("\t"));
    }
    for row in &ctx.rows {
        let fields: Vec<String> = row.iter().map(|v| v.display()).collect();
        lines.push(fields.join("\t"));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::sample_context;

    #[test]
    fn test_tsv_with_header() {
        assert_eq!(render(&sample_context()), "Name\tValue\nAlpha\t1\nBeta\t2");
    }

    #[test]
    fn test_tsv_without_header() {
        let mut ctx = sample_context();
        ctx.include_header = false;
        assert_eq!(render(&ctx), "Alpha\t1\nBeta\t2");
    }
}
