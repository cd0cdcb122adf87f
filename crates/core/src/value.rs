//! The typed cell value all columns read and write.
//!
//! A tagged variant over the column-value types the grid understands. Column
//! accessors produce `Value` from items and accept `Value` on commit, which
//! keeps sorting, filtering, searching and export working against one type
//! instead of reflective property paths.

use std::cmp::Ordering;

use chrono::NaiveDateTime;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Number format applied when displaying numeric values.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub enum NumberFormat {
    #[default]
    General,
    Number { decimals: u8 },
    Currency { decimals: u8 },
    Percent { decimals: u8 },
}

/// A single cell value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Empty,
    Boolean(bool),
    Number(f64),
    DateTime(NaiveDateTime),
    Text(String),
}

impl Default for Value {
    fn default() -> Self {
        Value::Empty
    }
}

impl Value {
    /// Parse free-form editor text into a value.
    ///
    /// Numbers win over text; "true"/"false" become booleans. Dates are not
    /// sniffed from text; date columns construct `DateTime` directly.
    pub fn from_input(input: &str) -> Self {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return Value::Empty;
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Value::Boolean(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Value::Boolean(false);
        }
        if let Ok(num) = trimmed.parse::<f64>() {
            return Value::Number(num);
        }

        Value::Text(trimmed.to_string())
    }

    /// Unformatted display text (what export and the editor see).
    pub fn display(&self) -> String {
        match self {
            Value::Empty => String::new(),
            Value::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Value::Text(s) => s.clone(),
        }
    }

    /// Format a number according to the specified format.
    pub fn format_number(n: f64, format: &NumberFormat) -> String {
        match format {
            NumberFormat::General => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", n as i64)
                } else {
                    format!("{:.2}", n)
                }
            }
            NumberFormat::Number { decimals } => {
                format!("{:.*}", *decimals as usize, n)
            }
            NumberFormat::Currency { decimals } => {
                if n < 0.0 {
                    format!("-${:.*}", *decimals as usize, n.abs())
                } else {
                    format!("${:.*}", *decimals as usize, n)
                }
            }
            NumberFormat::Percent { decimals } => {
                format!("{:.*}%", *decimals as usize, n * 100.0)
            }
        }
    }

    /// Display with a number format applied (non-numbers ignore the format).
    pub fn formatted_display(&self, format: &NumberFormat) -> String {
        match self {
            Value::Number(n) => Self::format_number(*n, format),
            other => other.display(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Type name for diagnostics (accessor type mismatches).
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Empty => "empty",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::DateTime(_) => "datetime",
            Value::Text(_) => "text",
        }
    }

    /// Rank used to order values of different types.
    /// Empty < Boolean < Number < DateTime < Text.
    fn type_rank(&self) -> u8 {
        match self {
            Value::Empty => 0,
            Value::Boolean(_) => 1,
            Value::Number(_) => 2,
            Value::DateTime(_) => 3,
            Value::Text(_) => 4,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    /// Total order for sorting. Mixed types order by `type_rank`; text
    /// compares case-insensitively with a case-sensitive tiebreak so the
    /// order stays total.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => OrderedFloat(*a).cmp(&OrderedFloat(*b)),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => {
                let folded = a.to_lowercase().cmp(&b.to_lowercase());
                if folded == Ordering::Equal {
                    a.cmp(b)
                } else {
                    folded
                }
            }
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}
