//! Wire types exchanged with the transport layer
//!
//! The transport delivers [`Patch`] values as opaque byte payloads; this
//! module owns their binary encoding (bincode).

pub mod patch;

pub use patch::Patch;
