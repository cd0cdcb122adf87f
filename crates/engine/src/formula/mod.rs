pub mod eval;
pub mod parser;
pub mod refs;
