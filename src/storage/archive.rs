//! Transportable snapshot of a whole content store.
//!
//! Wire format:
//! ```text
//! ┌──────────────┬──────────────────────────────────────────────┐
//! │ magic        │ lz4 (size-prepended)                          │
//! │ "WOOTSTATE"1 │   bincode { entries: [ { name, data } ... ] } │
//! └──────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! Each entry is one page file, stored under its encoded file name. The
//! archive is used to bootstrap a replica that just joined or fell too far
//! behind to catch up through patches.

use crate::error::{Result, WootError};
use crate::storage::{ensure_dir, write_atomic};
use serde::{Deserialize, Serialize};
use std::path::Path;

const MAGIC: &[u8] = b"WOOTSTATE\x01";

/// Largest decompressed body accepted from an archive (256 MiB)
const MAX_BODY_LEN: usize = 256 * 1024 * 1024;

/// One file of the archived directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: Vec<u8>,
}

/// Snapshot of every page file of a content directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateArchive {
    entries: Vec<ArchiveEntry>,
}

impl StateArchive {
    /// Read every regular, non-hidden file of `dir`
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let mut entries = Vec::new();
        let listing = std::fs::read_dir(dir).map_err(|e| WootError::io(dir, e))?;
        for entry in listing {
            let entry = entry.map_err(|e| WootError::io(dir, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            let data = std::fs::read(&path).map_err(|e| WootError::io(&path, e))?;
            entries.push(ArchiveEntry { name, data });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize to the compressed wire format
    pub fn encode(&self) -> Result<Vec<u8>> {
        let body = bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| WootError::Serialization(e.to_string()))?;
        if body.len() > MAX_BODY_LEN {
            return Err(WootError::Archive(format!(
                "state of {} bytes exceeds the {} byte limit",
                body.len(),
                MAX_BODY_LEN
            )));
        }
        let mut out = MAGIC.to_vec();
        out.extend_from_slice(&lz4_flex::compress_prepend_size(&body));
        Ok(out)
    }

    /// Parse and validate an archive produced by [`encode`](Self::encode)
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let body = bytes
            .strip_prefix(MAGIC)
            .ok_or_else(|| WootError::Archive("missing state archive header".to_string()))?;
        let declared = body
            .get(..4)
            .map(|len| u32::from_le_bytes([len[0], len[1], len[2], len[3]]) as usize)
            .ok_or_else(|| WootError::Archive("truncated state archive".to_string()))?;
        if declared > MAX_BODY_LEN {
            return Err(WootError::Archive(format!(
                "declared body of {} bytes exceeds the {} byte limit",
                declared, MAX_BODY_LEN
            )));
        }
        let body = lz4_flex::decompress_size_prepended(body)
            .map_err(|e| WootError::Archive(format!("decompression failed: {}", e)))?;
        let (archive, _): (Self, _) =
            bincode::serde::decode_from_slice(&body, bincode::config::standard())
                .map_err(|e| WootError::Archive(e.to_string()))?;

        for entry in &archive.entries {
            if !is_plain_file_name(&entry.name) {
                return Err(WootError::Archive(format!(
                    "illegal entry name {:?}",
                    entry.name
                )));
            }
        }
        Ok(archive)
    }

    /// Write every entry into `dir`, replacing files of the same name
    ///
    /// Not transactional: an I/O failure part way leaves the directory
    /// with a mix of old and new files.
    pub fn unpack_into(&self, dir: &Path) -> Result<()> {
        ensure_dir(dir)?;
        for entry in &self.entries {
            let path = dir.join(&entry.name);
            write_atomic(&path, &entry.data).map_err(|e| WootError::io(&path, e))?;
        }
        Ok(())
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_archive_directory_roundtrip() {
        let src = tempdir().unwrap();
        std::fs::write(src.path().join("PageA"), b"{\"a\":1}").unwrap();
        std::fs::write(src.path().join("PageB"), b"{\"b\":2}").unwrap();
        std::fs::write(src.path().join(".PageA.tmp"), b"partial").unwrap();

        let archive = StateArchive::from_dir(src.path()).unwrap();
        assert_eq!(archive.len(), 2);

        let bytes = archive.encode().unwrap();
        let decoded = StateArchive::decode(&bytes).unwrap();
        assert_eq!(decoded, archive);

        let dst = tempdir().unwrap();
        decoded.unpack_into(dst.path()).unwrap();
        assert_eq!(std::fs::read(dst.path().join("PageB")).unwrap(), b"{\"b\":2}");
        assert!(!dst.path().join(".PageA.tmp").exists());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            StateArchive::decode(b"definitely not an archive"),
            Err(WootError::Archive(_))
        ));

        let mut bad_body = MAGIC.to_vec();
        bad_body.extend_from_slice(&lz4_flex::compress_prepend_size(&[0xff; 3]));
        assert!(matches!(
            StateArchive::decode(&bad_body),
            Err(WootError::Archive(_))
        ));
    }

    #[test]
    fn test_decode_rejects_oversized_body() {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&[0x10, 0x00]);

        let err = StateArchive::decode(&bytes).unwrap_err();
        assert!(matches!(err, WootError::Archive(ref msg) if msg.contains("limit")));

        let mut truncated = MAGIC.to_vec();
        truncated.extend_from_slice(&[1, 0]);
        assert!(matches!(
            StateArchive::decode(&truncated),
            Err(WootError::Archive(_))
        ));
    }

    #[test]
    fn test_decode_rejects_path_traversal() {
        let archive = StateArchive {
            entries: vec![ArchiveEntry {
                name: "../escape".to_string(),
                data: vec![1],
            }],
        };
        let bytes = archive.encode().unwrap();

        assert!(matches!(
            StateArchive::decode(&bytes),
            Err(WootError::Archive(_))
        ));
    }

    #[test]
    fn test_plain_file_names() {
        assert!(is_plain_file_name("Main%2EWebHome"));
        assert!(!is_plain_file_name(".."));
        assert!(!is_plain_file_name("a/b"));
        assert!(!is_plain_file_name(""));
    }
}
