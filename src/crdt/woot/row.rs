//! Row: The unit of replicated content
//!
//! Each row carries:
//! - Unique ID (or a sentinel marker)
//! - Value (a character, a line, any caller-chosen unit)
//! - Degree, used to order concurrent insertions
//! - Visibility flag (tombstone when false)

use super::id::{Identifier, RowId};
use serde::{Deserialize, Serialize};

/// A single row in a WOOT content
///
/// Rows are never physically removed. Deleting a row only clears
/// `visible`, so concurrent operations that reference it stay resolvable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// Identity of this row
    pub id: RowId,

    /// The replicated value
    pub value: String,

    /// `1 + max(degree of neighbours)` at creation time
    pub degree: u32,

    /// Whether this row is rendered
    pub visible: bool,
}

impl Row {
    /// Create a new visible row
    pub fn new(id: Identifier, value: impl Into<String>, degree: u32) -> Self {
        Self {
            id: RowId::Id(id),
            value: value.into(),
            degree,
            visible: true,
        }
    }

    /// Start sentinel
    pub fn first() -> Self {
        Self {
            id: RowId::First,
            value: "[".to_string(),
            degree: 0,
            visible: false,
        }
    }

    /// End sentinel
    pub fn last() -> Self {
        Self {
            id: RowId::Last,
            value: "]".to_string(),
            degree: 0,
            visible: false,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.id.is_sentinel()
    }

    /// Degree for a row inserted between `previous` and `next`
    pub fn degree_between(previous: &Row, next: &Row) -> u32 {
        previous.degree.max(next.degree).saturating_add(1)
    }
}

impl std::fmt::Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(row {}, {}, {:?}, d={})",
            self.id, self.visible, self.value, self.degree
        )
    }
}
