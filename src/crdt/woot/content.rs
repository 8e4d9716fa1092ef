//! Content: the ordered, tombstone-preserving row sequence of one field
//!
//! ```text
//! index:    0      1     2     3     4
//! rows:  [FIRST] ("h") ("e") ("x") [LAST]
//! visible:  -      y     n     y     -        "hx"
//! ```
//!
//! Two sentinels bound the sequence. Visible positions count only visible
//! real rows, so visible position 0 is the first rendered row and the FIRST
//! sentinel anchors inserts at position 0.

use super::id::{ContentId, RowId};
use super::row::Row;
use serde::{Deserialize, Serialize};

/// Replicated content of one page field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    content_id: ContentId,
    rows: Vec<Row>,
}

impl Content {
    /// Create an empty content holding only the two sentinels
    pub fn new(content_id: ContentId) -> Self {
        Self {
            content_id,
            rows: vec![Row::first(), Row::last()],
        }
    }

    pub fn content_id(&self) -> &ContentId {
        &self.content_id
    }

    pub(crate) fn set_content_id(&mut self, content_id: ContentId) {
        self.content_id = content_id;
    }

    /// All rows, sentinels and tombstones included
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Raw sequence access
    pub fn element_at(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Number of real rows, tombstones included
    pub fn size(&self) -> usize {
        self.rows.len() - 2
    }

    /// Number of rendered rows
    pub fn size_of_visible(&self) -> usize {
        self.rows.iter().filter(|row| row.visible).count()
    }

    pub fn is_empty(&self) -> bool {
        self.size_of_visible() == 0
    }

    /// Sequence index of a row, or `None` if it is not (yet) known here
    pub fn index_of(&self, id: &RowId) -> Option<usize> {
        self.rows.iter().position(|row| &row.id == id)
    }

    /// Sequence index of a row strictly after `after`
    pub fn index_of_after(&self, after: usize, id: &RowId) -> Option<usize> {
        self.rows
            .iter()
            .enumerate()
            .skip(after + 1)
            .find(|(_, row)| &row.id == id)
            .map(|(index, _)| index)
    }

    pub fn contains(&self, id: &RowId) -> bool {
        self.index_of(id).is_some()
    }

    /// Sequence index of the `n`-th visible row (0-based, sentinels excluded)
    pub fn visible_index(&self, n: usize) -> Option<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.visible)
            .nth(n)
            .map(|(index, _)| index)
    }

    /// The `n`-th visible row
    pub fn visible_at(&self, n: usize) -> Option<&Row> {
        self.visible_index(n).map(|index| &self.rows[index])
    }

    /// First visible row strictly after `after`, or the LAST sentinel
    pub fn next_visible_index(&self, after: usize) -> usize {
        self.rows
            .iter()
            .enumerate()
            .skip(after + 1)
            .find(|(_, row)| row.visible)
            .map(|(index, _)| index)
            .unwrap_or(self.rows.len() - 1)
    }

    /// Sequence indices of the rows a new row at visible `position` sits between
    ///
    /// Returns `None` unless `position <= size_of_visible()`.
    pub fn insert_neighbors(&self, position: usize) -> Option<(usize, usize)> {
        let previous = if position == 0 {
            0
        } else {
            self.visible_index(position - 1)?
        };
        Some((previous, self.next_visible_index(previous)))
    }

    /// Place `row` immediately after sequence index `index`
    pub(crate) fn insert_after(&mut self, index: usize, row: Row) {
        self.rows.insert(index + 1, row);
    }

    /// Turn the row at `index` into a tombstone
    ///
    /// Returns false if it already was one.
    pub(crate) fn hide(&mut self, index: usize) -> bool {
        let row = &mut self.rows[index];
        let was_visible = row.visible;
        row.visible = false;
        was_visible
    }

    /// Check the sentinel invariants, used after loading from disk
    pub fn is_well_formed(&self) -> bool {
        self.rows.len() >= 2
            && self.rows[0].id == RowId::First
            && self.rows[self.rows.len() - 1].id == RowId::Last
            && !self.rows[0].visible
            && !self.rows[self.rows.len() - 1].visible
            && self.rows[1..self.rows.len() - 1]
                .iter()
                .all(|row| !row.is_sentinel())
    }

    /// Concatenated visible values
    pub fn to_visible_string(&self) -> String {
        self.rows
            .iter()
            .filter(|row| row.visible)
            .map(|row| row.value.as_str())
            .collect()
    }

    /// One visible row per line
    pub fn to_human_string(&self) -> String {
        let mut out = String::new();
        for row in self.rows.iter().filter(|row| row.visible) {
            out.push_str(&row.value);
            out.push('\n');
        }
        out
    }

    /// Every row value, tombstones and sentinel markers included
    pub fn to_internal_string(&self) -> String {
        self.rows.iter().map(|row| row.value.as_str()).collect()
    }
}
