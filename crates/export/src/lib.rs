// Clipboard export
// Each submodule renders one transfer format from an ExportContext.
// The textual outputs are stable contracts: hosts and tests depend on the
// exact bytes, so changes here are breaking.

pub mod context;
pub mod csv;
pub mod html;
pub mod json;
pub mod markdown;
pub mod text;
pub mod xml;
pub mod yaml;

pub use context::{build_payload, ClipboardPayload, ExportContext, FormatId};
