//! Waiting pool: operations whose anchors have not arrived yet.
//!
//! The pool is one JSON file per engine, whatever page its operations
//! target. Entries are only ever appended or removed; resolution always
//! rescans from the start, so no FIFO order is relied upon.
//!
//! Operations referencing rows that never arrive stay here forever.
//! Growth is unbounded; the engine logs a warning once the pool passes
//! its configured threshold.

use crate::crdt::woot::Operation;
use crate::error::{Result, WootError};
use crate::storage::{ensure_dir, write_atomic};
use std::path::{Path, PathBuf};

/// Durable list of pending operations
#[derive(Debug)]
pub struct Pool {
    path: PathBuf,
    operations: Vec<Operation>,
}

impl Pool {
    /// Open the pool file `file_name` inside `dir`, creating an empty one if absent
    pub fn open(dir: &Path, file_name: &str) -> Result<Self> {
        ensure_dir(dir)?;
        let mut pool = Self {
            path: dir.join(file_name),
            operations: Vec::new(),
        };
        pool.initialize(false)?;
        Ok(pool)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Make sure a pool file exists; with `overwrite`, start from an empty pool
    pub fn initialize(&mut self, overwrite: bool) -> Result<()> {
        if overwrite || !self.path.exists() {
            self.operations.clear();
            self.store()?;
        }
        Ok(())
    }

    /// Replace the in-memory entries with the file contents
    pub fn load(&mut self) -> Result<()> {
        if !self.path.exists() {
            self.operations.clear();
            return Ok(());
        }
        let bytes = std::fs::read(&self.path).map_err(|e| WootError::io(&self.path, e))?;
        self.operations = serde_json::from_slice(&bytes).map_err(|e| {
            WootError::Serialization(format!("pool file {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }

    pub fn store(&self) -> Result<()> {
        let bytes = serde_json::to_vec(&self.operations)
            .map_err(|e| WootError::Serialization(e.to_string()))?;
        write_atomic(&self.path, &bytes).map_err(|e| WootError::io(&self.path, e))
    }

    /// Store, then drop the in-memory entries
    pub fn unload(&mut self) -> Result<()> {
        self.store()?;
        self.free();
        Ok(())
    }

    pub fn free(&mut self) {
        self.operations = Vec::new();
    }

    pub fn push(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    pub fn get(&self, index: usize) -> Option<&Operation> {
        self.operations.get(index)
    }

    pub fn remove(&mut self, index: usize) -> Operation {
        self.operations.remove(index)
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Whether an operation with the same id is already waiting
    pub fn contains(&self, operation: &Operation) -> bool {
        self.operations
            .iter()
            .any(|waiting| waiting.op_id() == operation.op_id())
    }
}
