// XML clipboard format
//
// Contract:
//   <?xml version="1.0" encoding="UTF-8"?>
//   <grid><row><cell column="Name">Alpha</cell>...</row>...</grid>
// No indentation; quick-xml handles text escaping.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::context::ExportContext;

pub fn render(ctx: &ExportContext) -> Result<String, String> {
    let mut writer = Writer::new(Vec::new());

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| e.to_string())?;
    writer
        .write_event(Event::Start(BytesStart::new("grid")))
        .map_err(|e| e.to_string())?;

    for row in &ctx.rows {
        writer
            .write_event(Event::Start(BytesStart::new("row")))
            .map_err(|e| e.to_string())?;

        for (col, value) in row.iter().enumerate() {
            let mut cell = BytesStart::new("cell");
            if ctx.include_header {
                cell.push_attribute(("column", ctx.headers[col].as_str()));
            }
            writer
                .write_event(Event::Start(cell))
                .map_err(|e| e.to_string())?;
            writer
                .write_event(Event::Text(BytesText::new(&value.display())))
                .map_err(|e| e.to_string())?;
            writer
                .write_event(Event::End(BytesEnd::new("cell")))
                .map_err(|e| e.to_string())?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("row")))
            .map_err(|e| e.to_string())?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("grid")))
        .map_err(|e| e.to_string())?;

    String::from_utf8(writer.into_inner()).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{sample_context, ExportContext};
    use gridkit_core::value::Value;

    #[test]
    fn test_xml_golden() {
        let out = render(&sample_context()).unwrap();
        let expected = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
            <grid>\
            <row><cell column=\"Name\">Alpha</cell><cell column=\"Value\">1</cell></row>\
            <row><cell column=\"Name\">Beta</cell><cell column=\"Value\">2</cell></row>\
            </grid>";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_xml_without_header_drops_column_attr() {
        let mut ctx = sample_context();
        ctx.include_header = false;
        let out = render(&ctx).unwrap();
        assert!(!out.contains("column="));
        assert!(out.contains("<cell>Alpha</cell>"));
    }

    #[test]
    fn test_xml_escapes_text() {
        let ctx = ExportContext::new(
            vec!["A".into()],
            vec![vec![Value::Text("a<b&c".into())]],
            false,
        );
        let out = render(&ctx).unwrap();
        assert!(out.contains("a&lt;b&amp;c"));
    }
}
