//! Operations and the WOOT integration algorithm
//!
//! Two operation kinds exist:
//! - [`Insert`]: place a new row between two known rows
//! - [`Delete`]: turn a known row into a tombstone
//!
//! An operation is *ready* on a content when every row it references is
//! already there. Applying an unready operation leaves the content
//! untouched and reports [`ApplyOutcome::NotYetApplicable`]; the engine
//! parks such operations in its waiting pool.
//!
//! # Integration
//!
//! An insert generated between `previous` and `next` may meet rows that
//! other sites inserted concurrently in the same gap. All replicas must
//! pick the same slot, so the gap is narrowed deterministically:
//!
//! ```text
//! previous ... [rows of lowest degree in gap] ... next
//!                  |        |        |
//!          id < new?  -> previous moves right
//!          id >= new? -> next moves left
//! ```
//!
//! The loop repeats on the narrowed gap until `previous` and `next` are
//! adjacent, then the row goes in between. Tombstones take part in the
//! ordering even though they are not rendered.

use super::content::Content;
use super::id::{ContentId, Identifier, RowId};
use super::row::Row;
use serde::{Deserialize, Serialize};

/// Result of applying an operation to a content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The content changed
    Applied,
    /// A referenced row is missing; retry later
    NotYetApplicable,
    /// The effect is already present (duplicate delivery or state transfer)
    AlreadyApplied,
}

impl ApplyOutcome {
    /// True when the operation no longer needs to wait
    pub fn is_done(&self) -> bool {
        !matches!(self, ApplyOutcome::NotYetApplicable)
    }
}

/// Insert a row between two existing rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insert {
    pub op_id: Identifier,
    pub content_id: ContentId,
    pub row: Row,
    pub previous_id: RowId,
    pub next_id: RowId,
}

impl Insert {
    pub fn new(
        op_id: Identifier,
        content_id: ContentId,
        row: Row,
        previous_id: RowId,
        next_id: RowId,
    ) -> Self {
        Self {
            op_id,
            content_id,
            row,
            previous_id,
            next_id,
        }
    }

    /// Build a local insert between sequence indices `previous` and `next`
    ///
    /// The new row is identified by `op_id` and its degree derives from
    /// the two neighbours.
    pub fn between(
        content: &Content,
        previous: usize,
        next: usize,
        op_id: Identifier,
        value: impl Into<String>,
    ) -> Self {
        let previous_row = &content.rows()[previous];
        let next_row = &content.rows()[next];
        let degree = Row::degree_between(previous_row, next_row);

        Self {
            row: Row::new(op_id.clone(), value, degree),
            previous_id: previous_row.id.clone(),
            next_id: next_row.id.clone(),
            content_id: content.content_id().clone(),
            op_id,
        }
    }

    /// Indices of both anchors, `next` searched after `previous`
    fn anchors(&self, content: &Content) -> Option<(usize, usize)> {
        let previous = content.index_of(&self.previous_id)?;
        let next = content.index_of_after(previous, &self.next_id)?;
        Some((previous, next))
    }

    pub fn is_ready(&self, content: &Content) -> bool {
        self.anchors(content).is_some()
    }

    pub fn apply(&self, content: &mut Content) -> ApplyOutcome {
        if content.contains(&self.row.id) {
            return ApplyOutcome::AlreadyApplied;
        }
        let Some((mut previous, mut next)) = self.anchors(content) else {
            return ApplyOutcome::NotYetApplicable;
        };

        let new_id = &self.row.id;
        let rows = content.rows();
        while previous + 1 < next {
            let degree = rows[previous + 1..next]
                .iter()
                .map(|row| row.degree)
                .min()
                .unwrap_or(0);

            // Bounds are re-read each step: moving `next` ends the scan.
            let mut i = previous + 1;
            while i < next {
                let row = &rows[i];
                if row.degree == degree {
                    if row.id < *new_id {
                        previous = i;
                    } else {
                        next = i;
                    }
                }
                i += 1;
            }
        }

        content.insert_after(previous, self.row.clone());
        ApplyOutcome::Applied
    }
}

impl std::fmt::Display for Insert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} on {}] insert({}, {}, {})",
            self.op_id, self.content_id, self.row, self.previous_id, self.next_id
        )
    }
}

/// Hide an existing row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delete {
    pub op_id: Identifier,
    pub content_id: ContentId,
    pub target_id: Identifier,
}

impl Delete {
    pub fn new(op_id: Identifier, content_id: ContentId, target_id: Identifier) -> Self {
        Self {
            op_id,
            content_id,
            target_id,
        }
    }

    fn target(&self) -> RowId {
        RowId::Id(self.target_id.clone())
    }

    pub fn is_ready(&self, content: &Content) -> bool {
        content.contains(&self.target())
    }

    pub fn apply(&self, content: &mut Content) -> ApplyOutcome {
        match content.index_of(&self.target()) {
            None => ApplyOutcome::NotYetApplicable,
            Some(index) => {
                if content.hide(index) {
                    ApplyOutcome::Applied
                } else {
                    ApplyOutcome::AlreadyApplied
                }
            }
        }
    }
}

impl std::fmt::Display for Delete {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} on {}] delete({})",
            self.op_id, self.content_id, self.target_id
        )
    }
}

/// Any replicated operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Insert(Insert),
    Delete(Delete),
}

impl Operation {
    pub fn op_id(&self) -> &Identifier {
        match self {
            Operation::Insert(op) => &op.op_id,
            Operation::Delete(op) => &op.op_id,
        }
    }

    pub fn content_id(&self) -> &ContentId {
        match self {
            Operation::Insert(op) => &op.content_id,
            Operation::Delete(op) => &op.content_id,
        }
    }

    pub fn is_ready(&self, content: &Content) -> bool {
        match self {
            Operation::Insert(op) => op.is_ready(content),
            Operation::Delete(op) => op.is_ready(content),
        }
    }

    pub fn apply(&self, content: &mut Content) -> ApplyOutcome {
        match self {
            Operation::Insert(op) => op.apply(content),
            Operation::Delete(op) => op.apply(content),
        }
    }
}

impl From<Insert> for Operation {
    fn from(op: Insert) -> Self {
        Operation::Insert(op)
    }
}

impl From<Delete> for Operation {
    fn from(op: Delete) -> Self {
        Operation::Delete(op)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Insert(op) => op.fmt(f),
            Operation::Delete(op) => op.fmt(f),
        }
    }
}
