//! WOOT text replication: rows, contents and operations
//!
//! WOOT (WithOut Operational Transform) keeps every inserted row forever,
//! identified by a `(site, counter)` pair. Deletes only hide rows, so any
//! row a concurrent operation refers to stays resolvable, and concurrent
//! inserts into the same gap are ordered by degree and identifier the same
//! way on every replica.
//!
//! # Example
//!
//! ```rust
//! use wootkit_core::crdt::woot::{Content, ContentId, Identifier, Insert};
//!
//! let id = ContentId::new("Main.WebHome", "doc", "content").unwrap();
//! let mut site1 = Content::new(id.clone());
//! let mut site2 = Content::new(id);
//!
//! // Both sites insert at position 0 without seeing each other
//! let (p, n) = site1.insert_neighbors(0).unwrap();
//! let a = Insert::between(&site1, p, n, Identifier::new("site1", 1), "A");
//! a.apply(&mut site1);
//!
//! let (p, n) = site2.insert_neighbors(0).unwrap();
//! let b = Insert::between(&site2, p, n, Identifier::new("site2", 1), "B");
//! b.apply(&mut site2);
//!
//! // Exchange operations
//! b.apply(&mut site1);
//! a.apply(&mut site2);
//!
//! assert_eq!(site1.to_visible_string(), site2.to_visible_string());
//! ```
//!
//! # References
//!
//! - Oster, Urso, Molli, Imine: "Data Consistency for P2P Collaborative Editing" (CSCW 2006)

mod content;
mod id;
mod op;
mod row;

pub use content::Content;
pub use id::{ContentId, Identifier, RowId};
pub use op::{ApplyOutcome, Delete, Insert, Operation};
pub use row::Row;
