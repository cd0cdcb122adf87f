use serde::{Deserialize, Serialize};

use crate::formula::parser::{self, Expr};

/// Stored content of a cell, as entered by the user.
///
/// A formula keeps its source text so it can be re-edited verbatim; the
/// parsed AST rides along (None when the source failed to parse, in which
/// case evaluation yields a parse error value).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    #[serde(skip)]
    Formula { source: String, ast: Option<Expr> },
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Empty
    }
}

impl CellValue {
    pub fn from_input(input: &str) -> Self {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return CellValue::Empty;
        }

        if trimmed.starts_with('=') {
            let ast = parser::parse(trimmed).ok();
            return CellValue::Formula {
                source: trimmed.to_string(),
                ast,
            };
        }

        if let Ok(num) = trimmed.parse::<f64>() {
            return CellValue::Number(num);
        }

        CellValue::Text(trimmed.to_string())
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Formula { .. })
    }

    /// The text shown in an edit box: formula source for formulas,
    /// otherwise the literal content.
    pub fn raw_display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Formula { source, .. } => source.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_input_classifies() {
        assert!(matches!(CellValue::from_input(""), CellValue::Empty));
        assert!(matches!(CellValue::from_input("  "), CellValue::Empty));
        assert!(matches!(CellValue::from_input("3.5"), CellValue::Number(_)));
        assert!(matches!(CellValue::from_input("hello"), CellValue::Text(_)));
        assert!(matches!(CellValue::from_input("=1+2"), CellValue::Formula { .. }));
    }

    #[test]
    fn test_invalid_formula_keeps_source() {
        match CellValue::from_input("=SUM(") {
            CellValue::Formula { source, ast } => {
                assert_eq!(source, "=SUM(");
                assert!(ast.is_none());
            }
            other => panic!("expected formula, got {:?}", other),
        }
    }

    #[test]
    fn test_raw_display() {
        assert_eq!(CellValue::from_input("42").raw_display(), "42");
        assert_eq!(CellValue::from_input("=A1+1").raw_display(), "=A1+1");
        assert_eq!(CellValue::Empty.raw_display(), "");
    }
}
