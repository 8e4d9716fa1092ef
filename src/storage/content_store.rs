//! File-backed content store.
//!
//! One JSON page file per page holds every content of that page: each
//! object/field pair, main and copy. Contents are created lazily (two
//! sentinels only) the first time they are loaded, kept in memory while
//! in use and released again on unload.
//!
//! Loaded contents are shared as [`SharedContent`] handles. The `RwLock`
//! is the content-scoped lock: readers rendering a content never observe
//! an operation half applied.

use crate::crdt::woot::{Content, ContentId};
use crate::error::{Result, WootError};
use crate::storage::{ensure_dir, file_name, write_atomic};
use crate::{PageName, SiteID};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A loaded content behind its content-scoped lock
pub type SharedContent = Arc<RwLock<Content>>;

/// On-disk representation of one page
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PageFile {
    page_name: PageName,
    contents: Vec<Content>,
}

impl PageFile {
    fn new(page_name: &str) -> Self {
        Self {
            page_name: page_name.to_string(),
            contents: Vec::new(),
        }
    }

    fn get(&self, id: &ContentId) -> Option<&Content> {
        self.contents.iter().find(|c| c.content_id() == id)
    }

    fn upsert(&mut self, content: Content) {
        match self
            .contents
            .iter_mut()
            .find(|c| c.content_id() == content.content_id())
        {
            Some(slot) => *slot = content,
            None => self.contents.push(content),
        }
    }
}

/// Directory of page files plus the contents currently in memory
#[derive(Debug)]
pub struct ContentStore {
    site_id: SiteID,
    dir: PathBuf,
    loaded: HashMap<ContentId, SharedContent>,
}

impl ContentStore {
    /// Open (and create if needed) the contents directory
    pub fn open(site_id: impl Into<SiteID>, dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        ensure_dir(&dir)?;
        Ok(Self {
            site_id: site_id.into(),
            dir,
            loaded: HashMap::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn page_path(&self, page_name: &str) -> PathBuf {
        self.dir.join(file_name::encode(page_name))
    }

    fn read_page(&self, page_name: &str) -> Result<Option<PageFile>> {
        let path = self.page_path(page_name);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&path).map_err(|e| WootError::io(&path, e))?;
        let page: PageFile = serde_json::from_slice(&bytes).map_err(|e| {
            WootError::Serialization(format!("page file {}: {}", path.display(), e))
        })?;
        if let Some(bad) = page.contents.iter().find(|c| !c.is_well_formed()) {
            return Err(WootError::Serialization(format!(
                "content {} in {} lost its sentinels",
                bad.content_id(),
                path.display()
            )));
        }
        Ok(Some(page))
    }

    fn write_page(&self, page: &PageFile) -> Result<()> {
        let path = self.page_path(&page.page_name);
        let bytes =
            serde_json::to_vec(page).map_err(|e| WootError::Serialization(e.to_string()))?;
        write_atomic(&path, &bytes).map_err(|e| WootError::io(&path, e))
    }

    /// Get the content for `id`, creating it if it does not exist yet
    ///
    /// Creating a copy also creates the matching main content.
    pub fn load(&mut self, id: &ContentId) -> Result<SharedContent> {
        id.validate()?;
        if let Some(content) = self.loaded.get(id) {
            return Ok(Arc::clone(content));
        }

        let mut page = match self.read_page(&id.page_name)? {
            Some(page) => page,
            None => {
                log::debug!("{} - Create page file for {}", self.site_id, id.page_name);
                PageFile::new(&id.page_name)
            }
        };

        let content = match page.get(id) {
            Some(content) => content.clone(),
            None => {
                let content = Content::new(id.clone());
                page.upsert(content.clone());
                if id.is_copy && page.get(&id.canonical()).is_none() {
                    page.upsert(Content::new(id.canonical()));
                }
                self.write_page(&page)?;
                content
            }
        };

        let shared = Arc::new(RwLock::new(content));
        self.loaded.insert(id.clone(), Arc::clone(&shared));
        Ok(shared)
    }

    /// Get the copy slot of `id`
    pub fn load_copy(&mut self, id: &ContentId) -> Result<SharedContent> {
        self.load(&id.copy_of())
    }

    /// Write `content` into its page file
    pub fn store(&self, content: &Content) -> Result<()> {
        let id = content.content_id();
        let mut page = self
            .read_page(&id.page_name)?
            .unwrap_or_else(|| PageFile::new(&id.page_name));
        page.upsert(content.clone());
        self.write_page(&page)
    }

    /// Store `content` and release it from memory
    pub fn unload(&mut self, content: &SharedContent) -> Result<()> {
        let id = {
            let guard = content.read();
            self.store(&guard)?;
            guard.content_id().clone()
        };
        if let Some(cached) = self.loaded.get(&id) {
            if Arc::ptr_eq(cached, content) {
                self.loaded.remove(&id);
            }
        }
        Ok(())
    }

    /// Store a loaded content and drop it from memory unless a caller still holds it
    pub fn release(&mut self, id: &ContentId) -> Result<()> {
        let Some(content) = self.loaded.get(id) else {
            return Ok(());
        };
        self.store(&content.read())?;
        if Arc::strong_count(content) == 1 {
            self.loaded.remove(id);
        }
        Ok(())
    }

    /// Overwrite the copy of `id` with the current main content
    pub fn copy_content(&mut self, id: &ContentId) -> Result<SharedContent> {
        let main = self.load(&id.canonical())?;
        let copy_id = id.copy_of();
        let mut copy = main.read().clone();
        copy.set_content_id(copy_id.clone());
        self.store(&copy)?;

        match self.loaded.get(&copy_id) {
            Some(shared) => {
                *shared.write() = copy;
                Ok(Arc::clone(shared))
            }
            None => {
                let shared = Arc::new(RwLock::new(copy));
                self.loaded.insert(copy_id, Arc::clone(&shared));
                Ok(shared)
            }
        }
    }

    /// Current state of a content without creating it
    pub fn snapshot(&self, id: &ContentId) -> Result<Option<Content>> {
        if let Some(content) = self.loaded.get(id) {
            return Ok(Some(content.read().clone()));
        }
        Ok(self
            .read_page(&id.page_name)?
            .and_then(|page| page.get(id).cloned()))
    }

    /// Names of every page with a page file
    pub fn list_pages(&self) -> Result<Vec<PageName>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| WootError::io(&self.dir, e))?;
        let mut pages = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| WootError::io(&self.dir, e))?;
            if let Some(name) = entry.file_name().to_str().and_then(file_name::decode) {
                pages.push(name);
            }
        }
        pages.sort();
        Ok(pages)
    }

    /// Number of contents currently held in memory
    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    /// Store every in-memory content, keeping them loaded
    pub fn flush(&self) -> Result<()> {
        for content in self.loaded.values() {
            self.store(&content.read())?;
        }
        Ok(())
    }

    /// Delete every page file
    pub fn clear(&mut self) -> Result<()> {
        if self.dir.exists() {
            std::fs::remove_dir_all(&self.dir).map_err(|e| WootError::io(&self.dir, e))?;
        }
        self.loaded.clear();
        ensure_dir(&self.dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crdt::woot::{Identifier, Insert};
    use tempfile::tempdir;

    fn cid(page: &str) -> ContentId {
        ContentId::new(page, "obj", "content").unwrap()
    }

    fn append(content: &SharedContent, site: &str, counter: u64, value: &str) {
        let mut guard = content.write();
        let pos = guard.size_of_visible();
        let (p, n) = guard.insert_neighbors(pos).unwrap();
        let op = Insert::between(&guard, p, n, Identifier::new(site, counter), value);
        op.apply(&mut guard);
    }

    #[test]
    fn test_load_creates_content_lazily() {
        let dir = tempdir().unwrap();
        let mut store = ContentStore::open("s1", dir.path()).unwrap();

        let content = store.load(&cid("Main.WebHome")).unwrap();
        assert_eq!(content.read().size(), 0);
        assert_eq!(store.list_pages().unwrap(), vec!["Main.WebHome".to_string()]);
    }

    #[test]
    fn test_load_returns_same_handle_while_loaded() {
        let dir = tempdir().unwrap();
        let mut store = ContentStore::open("s1", dir.path()).unwrap();

        let a = store.load(&cid("P")).unwrap();
        let b = store.load(&cid("P")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_unload_persists_and_releases() {
        let dir = tempdir().unwrap();
        let mut store = ContentStore::open("s1", dir.path()).unwrap();

        let content = store.load(&cid("P")).unwrap();
        append(&content, "s1", 1, "hello");
        store.unload(&content).unwrap();
        assert_eq!(store.loaded_count(), 0);

        let reloaded = store.load(&cid("P")).unwrap();
        assert!(!Arc::ptr_eq(&content, &reloaded));
        assert_eq!(reloaded.read().to_visible_string(), "hello");
    }

    #[test]
    fn test_page_file_holds_several_contents() {
        let dir = tempdir().unwrap();
        let mut store = ContentStore::open("s1", dir.path()).unwrap();

        let title = ContentId::new("P", "obj", "title").unwrap();
        let body = ContentId::new("P", "obj", "body").unwrap();
        let t = store.load(&title).unwrap();
        let b = store.load(&body).unwrap();
        append(&t, "s1", 1, "Title");
        append(&b, "s1", 2, "Body");
        store.unload(&t).unwrap();
        store.unload(&b).unwrap();

        assert_eq!(store.list_pages().unwrap().len(), 1);
        assert_eq!(store.snapshot(&title).unwrap().unwrap().to_visible_string(), "Title");
        assert_eq!(store.snapshot(&body).unwrap().unwrap().to_visible_string(), "Body");
    }

    #[test]
    fn test_release_keeps_content_held_by_caller() {
        let dir = tempdir().unwrap();
        let mut store = ContentStore::open("s1", dir.path()).unwrap();

        let held = store.load(&cid("P")).unwrap();
        store.release(&cid("P")).unwrap();
        assert_eq!(store.loaded_count(), 1);

        drop(held);
        store.release(&cid("P")).unwrap();
        assert_eq!(store.loaded_count(), 0);
    }

    #[test]
    fn test_load_copy_creates_main() {
        let dir = tempdir().unwrap();
        let mut store = ContentStore::open("s1", dir.path()).unwrap();

        let copy = store.load_copy(&cid("P")).unwrap();
        assert!(copy.read().content_id().is_copy);
        assert!(store.snapshot(&cid("P")).unwrap().is_some());
    }

    #[test]
    fn test_copy_content_duplicates_main() {
        let dir = tempdir().unwrap();
        let mut store = ContentStore::open("s1", dir.path()).unwrap();

        let main = store.load(&cid("P")).unwrap();
        append(&main, "s1", 1, "draft");
        let copy = store.copy_content(&cid("P")).unwrap();

        let copy = copy.read();
        assert_eq!(copy.to_visible_string(), "draft");
        assert_eq!(copy.content_id(), &cid("P").copy_of());
    }

    #[test]
    fn test_snapshot_does_not_create() {
        let dir = tempdir().unwrap();
        let store = ContentStore::open("s1", dir.path()).unwrap();

        assert!(store.snapshot(&cid("Missing")).unwrap().is_none());
        assert!(store.list_pages().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_content_id_rejected() {
        let dir = tempdir().unwrap();
        let mut store = ContentStore::open("s1", dir.path()).unwrap();
        let bad = ContentId {
            page_name: String::new(),
            object_name: "obj".to_string(),
            field_name: "f".to_string(),
            is_copy: false,
        };

        assert!(matches!(store.load(&bad), Err(WootError::InvalidContentId(_))));
    }

    #[test]
    fn test_clear_removes_pages() {
        let dir = tempdir().unwrap();
        let mut store = ContentStore::open("s1", dir.path().join("contents")).unwrap();
        store.load(&cid("P")).unwrap();

        store.clear().unwrap();
        assert!(store.list_pages().unwrap().is_empty());
        assert_eq!(store.loaded_count(), 0);
    }
}
