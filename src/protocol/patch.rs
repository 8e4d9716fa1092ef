//! Patch: one site's causally ordered edit burst for one page
//!
//! Operations inside a patch are in generation order, so a patch produced
//! by a single site is normally applicable front to back. Patches travel
//! as opaque bytes through the transport layer.

use crate::crdt::woot::Operation;
use crate::error::{Result, WootError};
use serde::{Deserialize, Serialize};

/// An addressed batch of operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    /// WOOT operations, in generation order
    pub operations: Vec<Operation>,

    /// Opaque metadata operations handled outside the engine
    pub metadata: Vec<Vec<u8>>,

    pub page_id: String,
    pub object_id: String,

    /// Milliseconds since the epoch at creation
    pub timestamp: i64,
    pub version: u32,
    pub minor_version: u32,
}

impl Patch {
    pub fn new(
        operations: Vec<Operation>,
        page_id: impl Into<String>,
        object_id: impl Into<String>,
    ) -> Self {
        Self {
            operations,
            metadata: Vec::new(),
            page_id: page_id.into(),
            object_id: object_id.into(),
            timestamp: 0,
            version: 0,
            minor_version: 0,
        }
    }

    pub fn with_metadata(mut self, metadata: Vec<Vec<u8>>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_version(mut self, timestamp: i64, version: u32, minor_version: u32) -> Self {
        self.timestamp = timestamp;
        self.version = version;
        self.minor_version = minor_version;
        self
    }

    /// `page.object` address
    pub fn global_id(&self) -> String {
        format!("{}.{}", self.page_id, self.object_id)
    }

    /// True when there is nothing for the engine to apply
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Serialize to binary wire format
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| WootError::Serialization(e.to_string()))
    }

    /// Deserialize from binary wire format
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (patch, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| WootError::Serialization(e.to_string()))?;
        Ok(patch)
    }
}

impl std::fmt::Display for Patch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Patch {}", self.global_id())?;
        writeln!(
            f,
            "  timestamp: {} version: {}.{}",
            self.timestamp, self.version, self.minor_version
        )?;
        for op in &self.operations {
            writeln!(f, "  {}", op)?;
        }
        write!(f, "  ({} metadata operations)", self.metadata.len())
    }
}
