//! Durable storage for contents, the waiting pool and state archives.
//!
//! Layout of an engine working directory:
//! ```text
//! <working_dir>/
//!   clock.json              FileClock value
//!   pool.json               operations waiting for their anchors
//!   contents/
//!     <encoded page name>   every content of one page (JSON)
//! ```
//!
//! All files are replaced through [`write_atomic`], so a crash leaves
//! either the previous or the new version on disk, never a torn file.

pub mod archive;
pub mod content_store;
pub mod file_name;
pub mod pool;

pub use archive::StateArchive;
pub use content_store::{ContentStore, SharedContent};
pub use pool::Pool;

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// Replace `path` with `bytes` via a synced temp sibling and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

    {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}

/// Create `dir` and its parents if missing.
pub(crate) fn ensure_dir(dir: &Path) -> crate::Result<()> {
    fs::create_dir_all(dir).map_err(|e| crate::WootError::io(dir, e))
}
