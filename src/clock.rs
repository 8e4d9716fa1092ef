//! Per-site logical clock for operation identifiers
//!
//! Unlike vector clocks, WOOT only needs a strictly increasing counter
//! per site: the `(site, counter)` pair makes every identifier unique, and
//! causality is tracked by the rows an operation references.
//!
//! The engine takes its clock as an explicit collaborator. [`FileClock`]
//! persists its value in the working directory; [`MemoryClock`] keeps it in
//! memory for tests and short-lived replicas.
use crate::error::ClockError;
use crate::storage::write_atomic;
use std::path::{Path, PathBuf};

/// Clock contract consumed by the engine
pub trait Clock: Send {
    /// Increment and return the new value
    fn tick(&mut self) -> Result<u64, ClockError>;

    /// Current value without incrementing
    fn value(&self) -> u64;

    /// Reload the value from durable storage
    fn load(&mut self) -> Result<(), ClockError>;

    /// Write the value to durable storage
    fn store(&self) -> Result<(), ClockError>;
}

/// In-memory increasing clock
#[derive(Debug, Clone, Default)]
pub struct MemoryClock {
    value: u64,
}

impl MemoryClock {
    /// Create a new clock starting at 0
    pub fn new() -> Self {
        Self { value: 0 }
    }

    /// Create a clock resuming after `value`
    pub fn starting_at(value: u64) -> Self {
        Self { value }
    }
}

impl Clock for MemoryClock {
    fn tick(&mut self) -> Result<u64, ClockError> {
        self.value += 1;
        Ok(self.value)
    }

    fn value(&self) -> u64 {
        self.value
    }

    fn load(&mut self) -> Result<(), ClockError> {
        Ok(())
    }

    fn store(&self) -> Result<(), ClockError> {
        Ok(())
    }
}

/// Clock persisted as a JSON number in a file
///
/// Every tick is written through before it is handed out, so a restarted
/// site never reuses a counter.
#[derive(Debug)]
pub struct FileClock {
    path: PathBuf,
    value: u64,
}

impl FileClock {
    /// Open the clock file, creating it at 0 if absent
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ClockError> {
        let mut clock = Self {
            path: path.into(),
            value: 0,
        };
        clock.load()?;
        Ok(clock)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Restart at 0 and persist
    pub fn reset(&mut self) -> Result<(), ClockError> {
        self.value = 0;
        self.store()
    }
}

impl Clock for FileClock {
    fn tick(&mut self) -> Result<u64, ClockError> {
        self.value += 1;
        if let Err(e) = self.store() {
            self.value -= 1;
            return Err(e);
        }
        Ok(self.value)
    }

    fn value(&self) -> u64 {
        self.value
    }

    fn load(&mut self) -> Result<(), ClockError> {
        if !self.path.exists() {
            self.value = 0;
            return self.store();
        }

        let bytes = std::fs::read(&self.path).map_err(|source| ClockError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.value = serde_json::from_slice(&bytes).map_err(|e| ClockError::Corrupt {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    fn store(&self) -> Result<(), ClockError> {
        let bytes = serde_json::to_vec(&self.value).map_err(|e| ClockError::Corrupt {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        write_atomic(&self.path, &bytes).map_err(|source| ClockError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_clock_tick() {
        let mut clock = MemoryClock::new();
        assert_eq!(clock.value(), 0);
        assert_eq!(clock.tick().unwrap(), 1);
        assert_eq!(clock.tick().unwrap(), 2);
        assert_eq!(clock.value(), 2);
    }

    #[test]
    fn test_memory_clock_starting_at() {
        let mut clock = MemoryClock::starting_at(41);
        assert_eq!(clock.tick().unwrap(), 42);
    }

    #[test]
    fn test_file_clock_survives_restart() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clock.json");

        let mut clock = FileClock::open(&path).unwrap();
        assert_eq!(clock.tick().unwrap(), 1);
        assert_eq!(clock.tick().unwrap(), 2);
        drop(clock);

        let mut reopened = FileClock::open(&path).unwrap();
        assert_eq!(reopened.value(), 2);
        assert_eq!(reopened.tick().unwrap(), 3);
    }

    #[test]
    fn test_file_clock_reset() {
        let dir = tempdir().unwrap();
        let mut clock = FileClock::open(dir.path().join("clock.json")).unwrap();
        clock.tick().unwrap();
        clock.reset().unwrap();

        clock.load().unwrap();
        assert_eq!(clock.value(), 0);
    }

    #[test]
    fn test_file_clock_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clock.json");
        std::fs::write(&path, b"not a number").unwrap();

        let err = FileClock::open(&path).unwrap_err();
        assert!(matches!(err, ClockError::Corrupt { .. }));
    }
}
