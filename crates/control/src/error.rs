use std::fmt;

/// Errors for index/argument misuse on the grid's query surface.
///
/// Edit-state verbs return booleans instead; these errors cover the cases
/// where the caller passed an index the grid cannot interpret at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    ColumnOutOfRange { index: usize, count: usize },
    SlotOutOfRange { slot: isize, count: usize },
    NoCurrentCell,
    NotEditing,
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ColumnOutOfRange { index, count } => {
                write!(f, "column index {} out of range (count {})", index, count)
            }
            Self::SlotOutOfRange { slot, count } => {
                write!(f, "slot {} out of range (count {})", slot, count)
            }
            Self::NoCurrentCell => write!(f, "no current cell"),
            Self::NotEditing => write!(f, "grid is not in edit mode"),
        }
    }
}

impl std::error::Error for GridError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = GridError::SlotOutOfRange { slot: 9, count: 3 };
        assert_eq!(err.to_string(), "slot 9 out of range (count 3)");
        assert_eq!(GridError::NoCurrentCell.to_string(), "no current cell");
    }
}
