pub mod cell;
pub mod cell_id;
pub mod dep_graph;
pub mod formula;
pub mod sheet;
pub mod table_refs;
pub mod workbook;

pub use cell::CellValue;
pub use cell_id::{CellId, SheetId};
pub use formula::eval::Value;
pub use table_refs::{TableDef, TableRegistry};
pub use workbook::Workbook;
