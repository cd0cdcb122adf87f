//! Export context and payload types.
//!
//! The grid control builds an `ExportContext` from the current selection
//! (values already read through column accessors); exporters are pure
//! functions from context to text. A `ClipboardPayload` carries one string
//! per named format so the host can offer them all to the system clipboard.

use gridkit_core::value::Value;

/// Transfer format identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatId {
    PlainText,
    Csv,
    Html,
    Markdown,
    Xml,
    Yaml,
    Json,
}

impl FormatId {
    /// All formats, in the order payloads list them.
    pub const ALL: [FormatId; 7] = [
        FormatId::PlainText,
        FormatId::Csv,
        FormatId::Html,
        FormatId::Markdown,
        FormatId::Xml,
        FormatId::Yaml,
        FormatId::Json,
    ];

    /// MIME type offered to the system clipboard.
    pub fn mime(&self) -> &'static str {
        match self {
            Self::PlainText => "text/plain",
            Self::Csv => "text/csv",
            Self::Html => "text/html",
            Self::Markdown => "text/markdown",
            Self::Xml => "application/xml",
            Self::Yaml => "application/yaml",
            Self::Json => "application/json",
        }
    }
}

/// Snapshot of the selection being exported.
///
/// `rows` are in view order; every row has exactly `headers.len()` values.
#[derive(Debug, Clone)]
pub struct ExportContext {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// Whether exporters emit the header row.
    pub include_header: bool,
}

impl ExportContext {
    /// Rows are normalized to the header width: short rows pad with
    /// `Value::Empty`, long rows truncate. Renderers index headers by
    /// column and rely on this.
    pub fn new(headers: Vec<String>, mut rows: Vec<Vec<Value>>, include_header: bool) -> Self {
        if !headers.is_empty() {
            for row in &mut rows {
                row.resize(headers.len(), Value::Empty);
            }
        }
        Self { headers, rows, include_header }
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }
}

/// One rendered format.
#[derive(Debug, Clone)]
pub struct RenderedFormat {
    pub format: FormatId,
    pub content: String,
}

/// The full multi-format clipboard transfer.
#[derive(Debug, Clone, Default)]
pub struct ClipboardPayload {
    formats: Vec<RenderedFormat>,
}

impl ClipboardPayload {
    pub fn push(&mut self, format: FormatId, content: String) {
        self.formats.push(RenderedFormat { format, content });
    }

    pub fn get(&self, format: FormatId) -> Option<&str> {
        self.formats
            .iter()
            .find(|f| f.format == format)
            .map(|f| f.content.as_str())
    }

    pub fn formats(&self) -> &[RenderedFormat] {
        &self.formats
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

/// Render the requested formats. XML rendering can fail (writer error); a
/// failed format is skipped rather than sinking the whole payload.
pub fn build_payload(ctx: &ExportContext, formats: &[FormatId]) -> ClipboardPayload {
    let mut payload = ClipboardPayload::default();
    for &format in formats {
        let content = match format {
            FormatId::PlainText => crate::text::render(ctx),
            FormatId::Csv => crate::csv::render(ctx),
            FormatId::Html => crate::html::render(ctx),
            FormatId::Markdown => crate::markdown::render(ctx),
            FormatId::Xml => match crate::xml::render(ctx) {
                Ok(s) => s,
                Err(_) => continue,
            },
            FormatId::Yaml => crate::yaml::render(ctx),
            FormatId::Json => crate::json::render(ctx),
        };
        payload.push(format, content);
    }
    payload
}

#[cfg(test)]
pub(crate) fn sample_context() -> ExportContext {
    ExportContext::new(
        vec!["Name".into(), "Value".into()],
        vec![
            vec![Value::Text("Alpha".into()), Value::Number(1.0)],
            vec![Value::Text("Beta".into()), Value::Number(2.0)],
        ],
        true,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_contains_all_requested_formats() {
        let ctx = sample_context();
        let payload = build_payload(&ctx, &FormatId::ALL);
        for format in FormatId::ALL {
            assert!(payload.get(format).is_some(), "missing {:?}", format);
        }
    }

    #[test]
    fn test_ragged_rows_are_normalized() {
        let ctx = ExportContext::new(
            vec!["A".into(), "B".into()],
            vec![
                vec![Value::Number(1.0)],
                vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)],
            ],
            true,
        );
        assert!(ctx.rows.iter().all(|r| r.len() == 2));
        assert_eq!(ctx.rows[0][1], Value::Empty);
        // Renderers that key cells by header must not panic on this input
        assert!(crate::xml::render(&ctx).is_ok());
    }

    #[test]
    fn test_payload_lookup_miss() {
        let ctx = sample_context();
        let payload = build_payload(&ctx, &[FormatId::Csv]);
        assert!(payload.get(FormatId::Html).is_none());
    }
}
