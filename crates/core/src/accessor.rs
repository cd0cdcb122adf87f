//! Column value accessors.
//!
//! The grid never reflects over item properties by string name. Each column
//! carries a `ColumnAccessor` that reads a typed `Value` out of an item and
//! (for editable columns) writes one back. Setter failures are the
//! validation channel: a rejected write surfaces as an invalid cell, not a
//! panic.

use std::fmt;

use crate::value::Value;

/// Error returned when an accessor rejects a write.
#[derive(Debug, Clone, PartialEq)]
pub enum EditError {
    /// The value failed the item's own validation (setter rejected it).
    /// The message is user-facing.
    Validation(String),
    /// The column has no setter.
    ReadOnly,
    /// The value's type does not match what the column stores.
    WrongType { expected: &'static str, got: &'static str },
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "{msg}"),
            Self::ReadOnly => write!(f, "column is read-only"),
            Self::WrongType { expected, got } => {
                write!(f, "expected {expected} value, got {got}")
            }
        }
    }
}

impl std::error::Error for EditError {}

/// Strategy for reading and writing one column's value on an item.
pub trait ColumnAccessor<T> {
    /// Read the column value from an item.
    fn get(&self, item: &T) -> Value;

    /// Write a value back to an item. Default: read-only.
    fn set(&self, _item: &mut T, _value: Value) -> Result<(), EditError> {
        Err(EditError::ReadOnly)
    }

    /// True if this accessor has no setter.
    fn is_read_only(&self) -> bool {
        true
    }
}

type Getter<T> = Box<dyn Fn(&T) -> Value>;
type Setter<T> = Box<dyn Fn(&mut T, Value) -> Result<(), EditError>>;

/// Closure-backed accessor. The common case: one field in, one field out.
pub struct FieldAccessor<T> {
    get: Getter<T>,
    set: Option<Setter<T>>,
}

impl<T> FieldAccessor<T> {
    /// Read-write accessor from a getter and setter pair.
    pub fn new(
        get: impl Fn(&T) -> Value + 'static,
        set: impl Fn(&mut T, Value) -> Result<(), EditError> + 'static,
    ) -> Self {
        Self {
            get: Box::new(get),
            set: Some(Box::new(set)),
        }
    }

    /// Read-only accessor from a getter.
    pub fn read_only(get: impl Fn(&T) -> Value + 'static) -> Self {
        Self {
            get: Box::new(get),
            set: None,
        }
    }
}

impl<T> ColumnAccessor<T> for FieldAccessor<T> {
    fn get(&self, item: &T) -> Value {
        (self.get)(item)
    }

    fn set(&self, item: &mut T, value: Value) -> Result<(), EditError> {
        match &self.set {
            Some(setter) => setter(item, value),
            None => Err(EditError::ReadOnly),
        }
    }

    fn is_read_only(&self) -> bool {
        self.set.is_none()
    }
}

/// Extract a text payload or report the mismatch. Helper for setters of
/// text-typed columns.
pub fn expect_text(value: Value) -> Result<String, EditError> {
    match value {
        Value::Text(s) => Ok(s),
        Value::Empty => Ok(String::new()),
        other => Err(EditError::WrongType { expected: "text", got: other.type_name() }),
    }
}

/// Extract a numeric payload or report the mismatch.
pub fn expect_number(value: Value) -> Result<f64, EditError> {
    match value {
        Value::Number(n) => Ok(n),
        other => match other.as_number() {
            Some(n) => Ok(n),
            None => Err(EditError::WrongType { expected: "number", got: other.type_name() }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Person {
        name: String,
        age: f64,
    }

    fn name_accessor() -> FieldAccessor<Person> {
        FieldAccessor::new(
            |p: &Person| Value::Text(p.name.clone()),
            |p: &mut Person, v| {
                let s = expect_text(v)?;
                if s.is_empty() {
                    return Err(EditError::Validation("name must not be empty".into()));
                }
                p.name = s;
                Ok(())
            },
        )
    }

    #[test]
    fn test_get_set_roundtrip() {
        let acc = name_accessor();
        let mut p = Person { name: "Ada".into(), age: 36.0 };
        assert_eq!(acc.get(&p), Value::Text("Ada".into()));
        acc.set(&mut p, Value::Text("Grace".into())).unwrap();
        assert_eq!(p.name, "Grace");
    }

    #[test]
    fn test_validation_rejects_and_leaves_item_untouched() {
        let acc = name_accessor();
        let mut p = Person { name: "Ada".into(), age: 36.0 };
        let err = acc.set(&mut p, Value::Text(String::new())).unwrap_err();
        assert!(matches!(err, EditError::Validation(_)));
        assert_eq!(p.name, "Ada");
    }

    #[test]
    fn test_read_only_accessor() {
        let acc = FieldAccessor::read_only(|p: &Person| Value::Number(p.age));
        assert!(acc.is_read_only());
        let mut p = Person { name: "Ada".into(), age: 36.0 };
        assert_eq!(acc.set(&mut p, Value::Number(1.0)), Err(EditError::ReadOnly));
    }

    #[test]
    fn test_wrong_type_reported() {
        let err = expect_number(Value::Text("abc".into())).unwrap_err();
        assert_eq!(err, EditError::WrongType { expected: "number", got: "text" });
    }

    #[test]
    fn test_expect_number_coerces_boolean() {
        assert_eq!(expect_number(Value::Boolean(true)).unwrap(), 1.0);
    }
}
