//! WootKit Core - WOOT replication engine for collaborative text
//!
//! Each site edits its own replica of a page field and broadcasts the
//! resulting operations. Replicas that receive the same operations, in any
//! order and any number of times, converge to the same rows. It implements:
//! - Row sequences with tombstones and FIRST/LAST sentinels
//! - The WOOT integration algorithm for concurrent inserts
//! - A durable waiting pool for operations that arrive before their anchors
//! - File-backed page storage, patches and whole-state archives
//!
//! # Examples
//!
//! ```rust
//! use wootkit_core::{ContentId, EngineConfig, MemoryClock, Operation, Patch, WootEngine};
//!
//! let root = std::env::temp_dir().join("wootkit-doc-lib");
//! let site1 = WootEngine::new(EngineConfig::new("site1", root.join("1")), MemoryClock::new()).unwrap();
//! let site2 = WootEngine::new(EngineConfig::new("site2", root.join("2")), MemoryClock::new()).unwrap();
//! # site1.clear_working_dir().unwrap();
//! # site2.clear_working_dir().unwrap();
//!
//! let id = ContentId::new("Main.WebHome", "doc", "content").unwrap();
//! let content = site1.load_content(&id).unwrap();
//! let ops: Vec<Operation> = site1
//!     .insert_text(&content, "hi", 0)
//!     .unwrap()
//!     .into_iter()
//!     .map(Operation::from)
//!     .collect();
//!
//! site2.deliver_patch(&Patch::new(ops, "Main.WebHome", "doc")).unwrap();
//! assert_eq!(site2.content_visible(&id).unwrap().as_deref(), Some("hi"));
//! ```

pub mod clock;
pub mod config;
pub mod crdt;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod storage;

// Re-exports for convenience
pub use clock::{Clock, FileClock, MemoryClock};
pub use config::EngineConfig;
pub use crdt::woot::{ApplyOutcome, Content, ContentId, Delete, Identifier, Insert, Operation, RowId};
pub use engine::{DeliveryReport, WootEngine};
pub use error::{ClockError, EditKind, Result, WootError};
pub use protocol::Patch;
pub use storage::{SharedContent, StateArchive};

/// Site identifier type
pub type SiteID = String;

/// Page name type
pub type PageName = String;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_import() {
        let site: SiteID = "site-1".to_string();
        let id = Identifier::new(site.clone(), 1);
        assert_eq!(id.site_id, site);
    }
}
