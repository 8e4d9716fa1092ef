//! Engine configuration

use crate::error::{Result, WootError};
use crate::SiteID;
use std::path::{Path, PathBuf};

/// Directory holding the page files, relative to the working directory
pub const CONTENTS_DIR_NAME: &str = "contents";

/// Waiting pool file, relative to the working directory
pub const POOL_FILE_NAME: &str = "pool.json";

/// Default clock file name for [`FileClock`](crate::clock::FileClock)
pub const CLOCK_FILE_NAME: &str = "clock.json";

/// Pool size above which every delivery logs a warning
pub const DEFAULT_POOL_WARN_THRESHOLD: usize = 1000;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Identifier stamped into every local operation
    pub site_id: SiteID,
    /// Directory owning the contents, the pool and (optionally) the clock
    pub working_dir: PathBuf,
    /// Warn when this many operations wait for missing anchors
    pub pool_warn_threshold: usize,
}

impl EngineConfig {
    pub fn new(site_id: impl Into<SiteID>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            site_id: site_id.into(),
            working_dir: working_dir.into(),
            pool_warn_threshold: DEFAULT_POOL_WARN_THRESHOLD,
        }
    }

    pub fn with_pool_warn_threshold(mut self, threshold: usize) -> Self {
        self.pool_warn_threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.site_id.trim().is_empty() {
            return Err(WootError::InvalidSiteId);
        }
        Ok(())
    }

    pub fn contents_dir(&self) -> PathBuf {
        self.working_dir.join(CONTENTS_DIR_NAME)
    }

    pub fn clock_path(&self) -> PathBuf {
        self.working_dir.join(CLOCK_FILE_NAME)
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}
