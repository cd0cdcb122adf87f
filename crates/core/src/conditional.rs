//! Conditional formatting rules.
//!
//! Rules map a value condition to a style hint. The control evaluates rules
//! in declaration order and the first match wins, so rule order is priority.
//! Style hints name theme colors; resolving names to concrete colors is the
//! host's job (themes live in gridkit-config).

use serde::{Deserialize, Serialize};

use crate::descriptors::FilterOp;
use crate::value::Value;
use crate::ColumnId;

/// Condition evaluated against a cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// Reuse a filter operator against a fixed operand.
    Compare { op: FilterOp, operand: Value },
    /// Inclusive numeric/ordered range.
    Between { low: Value, high: Value },
}

impl Condition {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Compare { op, operand } => op.matches(value, operand),
            Self::Between { low, high } => value >= low && value <= high,
        }
    }
}

/// Style adjustments a matched rule requests.
///
/// Colors are theme color names, not literal colors, so rules survive theme
/// switches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleHint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground: Option<String>,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
}

impl StyleHint {
    pub fn background(name: impl Into<String>) -> Self {
        Self { background: Some(name.into()), ..Default::default() }
    }

    pub fn foreground(name: impl Into<String>) -> Self {
        Self { foreground: Some(name.into()), ..Default::default() }
    }

    pub fn with_bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn with_italic(mut self) -> Self {
        self.italic = true;
        self
    }
}

/// One conditional formatting rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalRule {
    /// None = rule applies to every column.
    pub column: Option<ColumnId>,
    pub condition: Condition,
    pub style: StyleHint,
}

impl ConditionalRule {
    pub fn new(condition: Condition, style: StyleHint) -> Self {
        Self { column: None, condition, style }
    }

    pub fn for_column(mut self, column: ColumnId) -> Self {
        self.column = Some(column);
        self
    }

    fn applies_to(&self, column: ColumnId) -> bool {
        self.column.is_none() || self.column == Some(column)
    }
}

/// Ordered rule list; first matching rule wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionalFormatting {
    rules: Vec<ConditionalRule>,
}

impl ConditionalFormatting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rule: ConditionalRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[ConditionalRule] {
        &self.rules
    }

    pub fn clear(&mut self) {
        self.rules.clear();
    }

    /// Style for a cell, or None if no rule matches.
    pub fn style_for(&self, column: ColumnId, value: &Value) -> Option<&StyleHint> {
        self.rules
            .iter()
            .find(|rule| rule.applies_to(column) && rule.condition.matches(value))
            .map(|rule| &rule.style)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_between_inclusive() {
        let cond = Condition::Between { low: Value::Number(1.0), high: Value::Number(5.0) };
        assert!(cond.matches(&Value::Number(1.0)));
        assert!(cond.matches(&Value::Number(5.0)));
        assert!(!cond.matches(&Value::Number(5.1)));
    }

    #[test]
    fn test_first_match_wins() {
        let mut fmt = ConditionalFormatting::new();
        fmt.add(ConditionalRule::new(
            Condition::Compare { op: FilterOp::LessThan, operand: Value::Number(0.0) },
            StyleHint::foreground("negative"),
        ));
        fmt.add(ConditionalRule::new(
            Condition::Compare { op: FilterOp::LessThan, operand: Value::Number(100.0) },
            StyleHint::foreground("small"),
        ));

        let style = fmt.style_for(ColumnId(0), &Value::Number(-3.0)).unwrap();
        assert_eq!(style.foreground.as_deref(), Some("negative"));
    }

    #[test]
    fn test_column_scoped_rule() {
        let mut fmt = ConditionalFormatting::new();
        fmt.add(
            ConditionalRule::new(
                Condition::Compare { op: FilterOp::IsEmpty, operand: Value::Empty },
                StyleHint::background("missing"),
            )
            .for_column(ColumnId(1)),
        );

        assert!(fmt.style_for(ColumnId(1), &Value::Empty).is_some());
        assert!(fmt.style_for(ColumnId(0), &Value::Empty).is_none());
    }

    #[test]
    fn test_no_match_returns_none() {
        let fmt = ConditionalFormatting::new();
        assert!(fmt.style_for(ColumnId(0), &Value::Number(1.0)).is_none());
    }
}
