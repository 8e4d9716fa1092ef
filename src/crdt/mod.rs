//! CRDT (Conflict-free Replicated Data Types) implementations
//!
//! This module contains the replicated data structures the engine applies
//! operations to. Replicas converge without coordination and without
//! transforming operations against each other.
//!
//! # CRDTs Implemented
//!
//! - **WOOT sequence:** Tombstone-preserving row sequence for collaborative text
//!
//! # References
//!
//! - "A comprehensive study of CRDTs" by Marc Shapiro et al.
//! - "Data Consistency for P2P Collaborative Editing" (WOOT)

pub mod woot;

pub use woot::{Content, ContentId, Identifier, Operation};
