// CSV clipboard format
//
// Contract: `\r\n` row terminators, fields quoted only when they contain
// the delimiter, quotes or line breaks. Trailing terminator after the last
// row (standard CSV file shape).

use csv::{Terminator, WriterBuilder};

use crate::context::ExportContext;

pub fn render(ctx: &ExportContext) -> String {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::CRLF)
        .from_writer(Vec::new());

    if ctx.include_header {
        // Ignore write errors: the sink is a Vec, they cannot occur
        let _ = writer.write_record(&ctx.headers);
    }
    for row in &ctx.rows {
        let record: Vec<String> = row.iter().map(|v| v.display()).collect();
        let _ = writer.write_record(&record);
    }

    let bytes = writer.into_inner().unwrap_or_default();
    String::from_utf8(bytes).unwrap_or_default()
}
