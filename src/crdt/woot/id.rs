//! Identifiers: stable identity for rows, operations and contents
//!
//! Each row in a WOOT content has a unique ID composed of:
//! - Site ID: Identifies the replica that created the row
//! - Counter: Per-site logical clock value at creation time
//!
//! Rows are additionally bounded by two sentinels, [`RowId::First`] and
//! [`RowId::Last`], which order before and after every real identifier.

use crate::error::{Result, WootError};
use crate::{PageName, SiteID};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Unique identifier of an operation and of the row it creates
///
/// Identifiers are unique per site by construction: the counter comes
/// from a strictly increasing per-site clock.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    /// Site that created this identifier
    pub site_id: SiteID,

    /// Clock value at creation time
    pub counter: u64,
}

impl Identifier {
    /// Create a new identifier
    pub fn new(site_id: impl Into<SiteID>, counter: u64) -> Self {
        Self {
            site_id: site_id.into(),
            counter,
        }
    }
}

/// Total order used by the integration tie-break: site first, then counter.
impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.site_id.cmp(&other.site_id) {
            Ordering::Equal => self.counter.cmp(&other.counter),
            other => other,
        }
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.site_id, self.counter)
    }
}

/// Identity of a row in a content sequence
///
/// Variant order gives `First < Id(_) < Last`, so the sentinels act as
/// -inf and +inf and can never equal a real identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RowId {
    First,
    Id(Identifier),
    Last,
}

impl RowId {
    pub fn is_sentinel(&self) -> bool {
        !matches!(self, RowId::Id(_))
    }

    /// The real identifier, if this is not a sentinel
    pub fn identifier(&self) -> Option<&Identifier> {
        match self {
            RowId::Id(id) => Some(id),
            _ => None,
        }
    }
}

impl From<Identifier> for RowId {
    fn from(id: Identifier) -> Self {
        RowId::Id(id)
    }
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowId::First => write!(f, "FIRST"),
            RowId::Id(id) => write!(f, "{}", id),
            RowId::Last => write!(f, "LAST"),
        }
    }
}

/// Address of one replicated content: a field of an object on a page
///
/// A page can hold a "copy" of each content. Copies are edited locally
/// but every operation produced on a copy is propagated against the
/// canonical (non-copy) id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentId {
    pub page_name: PageName,
    pub object_name: String,
    pub field_name: String,
    pub is_copy: bool,
}

impl ContentId {
    /// Create the id of a main (non-copy) content
    ///
    /// Page and object names must not be blank.
    pub fn new(
        page_name: impl Into<PageName>,
        object_name: impl Into<String>,
        field_name: impl Into<String>,
    ) -> Result<Self> {
        let id = Self {
            page_name: page_name.into(),
            object_name: object_name.into(),
            field_name: field_name.into(),
            is_copy: false,
        };
        id.validate()?;
        Ok(id)
    }

    /// Reject ids with a blank page or object name
    pub fn validate(&self) -> Result<()> {
        if self.page_name.trim().is_empty() {
            return Err(WootError::InvalidContentId(format!(
                "empty page name in {}",
                self
            )));
        }
        if self.object_name.trim().is_empty() {
            return Err(WootError::InvalidContentId(format!(
                "empty object name in {}",
                self
            )));
        }
        Ok(())
    }

    /// The copy slot for the same page/object/field
    pub fn copy_of(&self) -> Self {
        Self {
            is_copy: true,
            ..self.clone()
        }
    }

    /// The main (non-copy) id for the same page/object/field
    pub fn canonical(&self) -> Self {
        Self {
            is_copy: false,
            ..self.clone()
        }
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.page_name, self.object_name, self.field_name
        )?;
        if self.is_copy {
            write!(f, " (copy)")?;
        }
        Ok(())
    }
}
