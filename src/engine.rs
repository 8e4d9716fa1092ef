//! WootEngine: local edits, patch delivery and state transfer for one site
//!
//! ```text
//!  local edit ──► insert/delete ──► Operation (stamped site:tick) ──► caller propagates
//!                      │
//!                      ▼
//!                 SharedContent ◄────── ContentStore (page files)
//!                      ▲
//!                      │ apply
//!  Patch ──► deliver_patch ──► ready? ──no──► Pool (pool.json)
//!                                 │              │
//!                                 yes            │ rescan until nothing applies
//!                                 ▼              ▼
//!                              applied ◄──── waiting-queue resolution
//! ```
//!
//! All public calls on one engine are serialized by a single engine lock,
//! which keeps the page files and the pool file mutually consistent. Each
//! content additionally sits behind its own `RwLock`; the engine always
//! takes the engine lock first.
//!
//! # Example
//!
//! ```rust
//! use wootkit_core::{ContentId, EngineConfig, MemoryClock, WootEngine};
//!
//! let dir = std::env::temp_dir().join("wootkit-doc-engine");
//! let engine = WootEngine::new(EngineConfig::new("site1", &dir), MemoryClock::new()).unwrap();
//! # engine.clear_working_dir().unwrap();
//!
//! let id = ContentId::new("Main.WebHome", "doc", "content").unwrap();
//! let content = engine.load_content(&id).unwrap();
//! engine.insert_text(&content, "hello", 0).unwrap();
//! engine.insert_text(&content, " world", 5).unwrap();
//!
//! assert_eq!(content.read().to_visible_string(), "hello world");
//! engine.unload_content(&content).unwrap();
//! ```

use crate::clock::{Clock, FileClock};
use crate::config::{EngineConfig, POOL_FILE_NAME};
use crate::crdt::woot::{ApplyOutcome, Content, ContentId, Delete, Identifier, Insert};
use crate::error::{EditKind, Result, WootError};
use crate::protocol::Patch;
use crate::storage::{ensure_dir, ContentStore, Pool, SharedContent, StateArchive};
use crate::PageName;
use parking_lot::Mutex;
use std::collections::HashSet;

/// What a patch delivery did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Patch operations applied on arrival
    pub applied: usize,
    /// Patch operations whose effect was already present
    pub already_applied: usize,
    /// Patch operations moved to the pool
    pub parked: usize,
    /// Pooled operations applied during waiting-queue resolution
    pub resolved: usize,
    /// Operations still waiting afterwards
    pub pending: usize,
}

struct EngineInner {
    clock: Box<dyn Clock>,
    pool: Pool,
    contents: ContentStore,
}

/// Replication engine of one site
pub struct WootEngine {
    config: EngineConfig,
    inner: Mutex<EngineInner>,
}

impl WootEngine {
    /// Create an engine over `config.working_dir` with an explicit clock
    pub fn new(config: EngineConfig, clock: impl Clock + 'static) -> Result<Self> {
        config.validate()?;
        ensure_dir(&config.working_dir)?;
        let pool = Pool::open(&config.working_dir, POOL_FILE_NAME)?;
        let contents = ContentStore::open(config.site_id.clone(), config.contents_dir())?;

        log::info!("{} - WootEngine created.", config.site_id);
        Ok(Self {
            config,
            inner: Mutex::new(EngineInner {
                clock: Box::new(clock),
                pool,
                contents,
            }),
        })
    }

    /// Create an engine whose clock lives in the working directory
    pub fn with_file_clock(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        ensure_dir(&config.working_dir)?;
        let clock = FileClock::open(config.clock_path())?;
        Self::new(config, clock)
    }

    pub fn site_id(&self) -> &str {
        &self.config.site_id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Log a failure with the site prefix before handing it back
    fn logged<T>(&self, result: Result<T>) -> Result<T> {
        result.map_err(|e| {
            log::error!("{} - {}", self.config.site_id, e);
            e
        })
    }

    // ─── Contents ────────────────────────────────────────────────────────

    /// Load (creating if needed) a main content
    pub fn load_content(&self, id: &ContentId) -> Result<SharedContent> {
        let result = self.inner.lock().contents.load(id);
        self.logged(result)
    }

    /// Load (creating if needed) the copy slot of a content
    pub fn load_content_copy(&self, id: &ContentId) -> Result<SharedContent> {
        let result = self.inner.lock().contents.load_copy(id);
        self.logged(result)
    }

    /// Reset the copy slot of `id` to the current main content
    pub fn copy_content(&self, id: &ContentId) -> Result<SharedContent> {
        let result = self.inner.lock().contents.copy_content(id);
        self.logged(result)
    }

    /// Persist a content without releasing it
    pub fn store_content(&self, content: &SharedContent) -> Result<()> {
        let inner = self.inner.lock();
        let result = inner.contents.store(&content.read());
        self.logged(result)
    }

    /// Persist a content and release it from memory
    pub fn unload_content(&self, content: &SharedContent) -> Result<()> {
        let result = self.inner.lock().contents.unload(content);
        self.logged(result)
    }

    fn snapshot(&self, id: &ContentId) -> Result<Option<Content>> {
        let result = self.inner.lock().contents.snapshot(id);
        self.logged(result)
    }

    /// Visible rows, one per line; `None` if the content does not exist
    pub fn content_text(&self, id: &ContentId) -> Result<Option<String>> {
        Ok(self.snapshot(id)?.map(|c| c.to_human_string()))
    }

    /// Concatenated visible values; `None` if the content does not exist
    pub fn content_visible(&self, id: &ContentId) -> Result<Option<String>> {
        Ok(self.snapshot(id)?.map(|c| c.to_visible_string()))
    }

    /// Every row value including tombstones and sentinel markers
    pub fn content_internal(&self, id: &ContentId) -> Result<Option<String>> {
        Ok(self.snapshot(id)?.map(|c| c.to_internal_string()))
    }

    pub fn list_pages(&self) -> Result<Vec<PageName>> {
        let result = self.inner.lock().contents.list_pages();
        self.logged(result)
    }

    // ─── Local edits ─────────────────────────────────────────────────────

    /// Fail unless a row can be inserted at visible `position`
    fn check_insert(content: &Content, position: usize) -> Result<()> {
        let visible_size = content.size_of_visible();
        if position > visible_size {
            return Err(WootError::InvalidPosition {
                op: EditKind::Insert,
                position,
                visible_size,
                content_id: content.content_id().clone(),
            });
        }
        Ok(())
    }

    /// Fail unless `len` visible rows exist from `position` on
    fn check_delete(content: &Content, position: usize, len: usize) -> Result<()> {
        let visible_size = content.size_of_visible();
        match position.checked_add(len) {
            Some(end) if end <= visible_size && position < visible_size => Ok(()),
            _ => Err(WootError::InvalidPosition {
                op: EditKind::Delete,
                position,
                visible_size,
                content_id: content.content_id().clone(),
            }),
        }
    }

    /// Draw `count` identifiers from the clock before any content changes
    ///
    /// A clock failure part way leaves gaps in the counter, never a
    /// half-applied edit.
    fn stamp(&self, inner: &mut EngineInner, count: usize) -> Result<Vec<Identifier>> {
        (0..count)
            .map(|_| -> Result<Identifier> {
                Ok(Identifier::new(self.config.site_id.clone(), inner.clock.tick()?))
            })
            .collect()
    }

    fn insert_locked(
        &self,
        content: &mut Content,
        op_id: Identifier,
        value: String,
        position: usize,
    ) -> Result<Insert> {
        Self::check_insert(content, position)?;
        let Some((previous, next)) = content.insert_neighbors(position) else {
            return Err(WootError::InvalidPosition {
                op: EditKind::Insert,
                position,
                visible_size: content.size_of_visible(),
                content_id: content.content_id().clone(),
            });
        };

        let mut op = Insert::between(content, previous, next, op_id, value);
        op.apply(content);
        log::debug!("{} - Operation executed: {}", self.config.site_id, op);

        // Operations made on a copy propagate against the main content
        op.content_id = op.content_id.canonical();
        Ok(op)
    }

    fn delete_locked(
        &self,
        content: &mut Content,
        op_id: Identifier,
        position: usize,
    ) -> Result<Delete> {
        Self::check_delete(content, position, 1)?;
        let target = content
            .visible_at(position)
            .and_then(|row| row.id.identifier())
            .cloned();
        let Some(target) = target else {
            return Err(WootError::InvalidPosition {
                op: EditKind::Delete,
                position,
                visible_size: content.size_of_visible(),
                content_id: content.content_id().clone(),
            });
        };

        let mut op = Delete::new(op_id, content.content_id().clone(), target);
        op.apply(content);
        log::debug!("{} - Operation executed: {}", self.config.site_id, op);

        op.content_id = op.content_id.canonical();
        Ok(op)
    }

    /// Insert one row holding `value` at visible `position`
    ///
    /// Fails with [`WootError::InvalidPosition`] unless
    /// `position <= size_of_visible()`. The returned operation is already
    /// applied locally and ready to propagate.
    pub fn insert(
        &self,
        content: &SharedContent,
        value: impl Into<String>,
        position: usize,
    ) -> Result<Insert> {
        let mut inner = self.inner.lock();
        let mut content = content.write();
        let result = (|| -> Result<Insert> {
            Self::check_insert(&content, position)?;
            let op_id = Identifier::new(self.config.site_id.clone(), inner.clock.tick()?);
            self.insert_locked(&mut content, op_id, value.into(), position)
        })();
        self.logged(result)
    }

    /// Insert `text` one row per character, starting at visible `position`
    ///
    /// Returns the inserts in generation order. Either every character is
    /// inserted or the content is left untouched.
    pub fn insert_text(
        &self,
        content: &SharedContent,
        text: &str,
        position: usize,
    ) -> Result<Vec<Insert>> {
        let mut inner = self.inner.lock();
        let mut content = content.write();
        let result = (|| -> Result<Vec<Insert>> {
            Self::check_insert(&content, position)?;
            let op_ids = self.stamp(&mut inner, text.chars().count())?;
            text.chars()
                .zip(op_ids)
                .enumerate()
                .map(|(i, (ch, op_id))| {
                    self.insert_locked(&mut content, op_id, ch.to_string(), position + i)
                })
                .collect()
        })();
        self.logged(result)
    }

    /// Hide the visible row at `position`
    ///
    /// Fails with [`WootError::InvalidPosition`] unless
    /// `position < size_of_visible()`.
    pub fn delete(&self, content: &SharedContent, position: usize) -> Result<Delete> {
        let mut inner = self.inner.lock();
        let mut content = content.write();
        let result = (|| -> Result<Delete> {
            Self::check_delete(&content, position, 1)?;
            let op_id = Identifier::new(self.config.site_id.clone(), inner.clock.tick()?);
            self.delete_locked(&mut content, op_id, position)
        })();
        self.logged(result)
    }

    /// Hide `len` visible rows starting at `position`
    ///
    /// Either all `len` rows are hidden or the content is left untouched.
    pub fn delete_range(
        &self,
        content: &SharedContent,
        position: usize,
        len: usize,
    ) -> Result<Vec<Delete>> {
        let mut inner = self.inner.lock();
        let mut content = content.write();
        let result = (|| -> Result<Vec<Delete>> {
            if len == 0 {
                return Ok(Vec::new());
            }
            Self::check_delete(&content, position, len)?;
            let op_ids = self.stamp(&mut inner, len)?;
            op_ids
                .into_iter()
                .map(|op_id| self.delete_locked(&mut content, op_id, position))
                .collect()
        })();
        self.logged(result)
    }

    // ─── Remote delivery ─────────────────────────────────────────────────

    /// Apply a received patch, park what is not ready, then drain the pool
    ///
    /// Contents touched by the delivery are persisted and released from
    /// memory afterwards (unless a caller still holds them).
    pub fn deliver_patch(&self, patch: &Patch) -> Result<DeliveryReport> {
        let mut inner = self.inner.lock();
        log::info!(
            "{} - Reception of a new patch for {}",
            self.config.site_id,
            patch.global_id()
        );
        log::debug!("{} - {}", self.config.site_id, patch);

        if patch.is_empty() {
            return Ok(DeliveryReport::default());
        }
        let result = self.deliver_locked(&mut inner, patch);
        self.logged(result)
    }

    fn deliver_locked(&self, inner: &mut EngineInner, patch: &Patch) -> Result<DeliveryReport> {
        let site = &self.config.site_id;
        for op in &patch.operations {
            op.content_id().validate()?;
        }

        let mut touched = HashSet::new();
        let mut report = DeliveryReport::default();
        inner.pool.load()?;

        for op in &patch.operations {
            let content = inner.contents.load(op.content_id())?;
            touched.insert(op.content_id().clone());

            let outcome = op.apply(&mut content.write());
            match outcome {
                ApplyOutcome::Applied => {
                    report.applied += 1;
                    log::debug!("{} - Operation executed: {}", site, op);
                }
                ApplyOutcome::AlreadyApplied => {
                    report.already_applied += 1;
                    log::debug!("{} - Operation already executed: {}", site, op);
                }
                ApplyOutcome::NotYetApplicable => {
                    report.parked += 1;
                    if !inner.pool.contains(op) {
                        log::debug!("{} - Appending to waiting queue: {}", site, op);
                        inner.pool.push(op.clone());
                    }
                }
            }
        }
        inner.pool.store()?;

        report.resolved = self.resolve_waiting(inner, &mut touched)?;
        report.pending = inner.pool.len();
        if report.pending > self.config.pool_warn_threshold {
            log::warn!(
                "{} - {} operations are waiting for missing rows",
                site,
                report.pending
            );
        }
        inner.pool.unload()?;

        for id in &touched {
            inner.contents.release(id)?;
        }
        Ok(report)
    }

    /// Apply pooled operations until a full pass applies nothing
    ///
    /// Any application can unblock any pooled operation, so the scan
    /// restarts from the beginning after every success.
    fn resolve_waiting(
        &self,
        inner: &mut EngineInner,
        touched: &mut HashSet<ContentId>,
    ) -> Result<usize> {
        let site = &self.config.site_id;
        log::debug!("{} - Waiting queue execution ({} pending)", site, inner.pool.len());

        let mut resolved = 0;
        let mut i = 0;
        while let Some(op) = inner.pool.get(i) {
            let content = inner.contents.load(op.content_id())?;
            touched.insert(op.content_id().clone());
            let done = op.apply(&mut content.write()).is_done();
            if done {
                let op = inner.pool.remove(i);
                inner.pool.store()?;
                resolved += 1;
                log::debug!("{} - Operation executed from waiting queue: {}", site, op);
                i = 0;
            } else {
                i += 1;
            }
        }
        Ok(resolved)
    }

    /// Number of operations waiting for missing rows
    pub fn pool_len(&self) -> Result<usize> {
        let mut inner = self.inner.lock();
        let result = inner.pool.load().map(|_| inner.pool.len());
        inner.pool.free();
        self.logged(result)
    }

    // ─── State transfer ──────────────────────────────────────────────────

    /// Archive the whole content store for a replica bootstrapping from us
    ///
    /// Loaded contents are persisted first so the archive includes them.
    pub fn get_state(&self) -> Result<Vec<u8>> {
        let inner = self.inner.lock();
        let result = (|| -> Result<Vec<u8>> {
            inner.contents.flush()?;
            let archive = StateArchive::from_dir(inner.contents.dir())?;
            log::info!(
                "{} - Exporting state with {} pages",
                self.config.site_id,
                archive.len()
            );
            archive.encode()
        })();
        self.logged(result)
    }

    /// Replace the content store with an archive from [`get_state`](Self::get_state)
    ///
    /// The archive is fully decoded before anything is touched, but the
    /// replacement itself is not transactional: an I/O failure part way
    /// leaves a mix of old and new pages. Content handles loaded before
    /// the call are detached from the store afterwards.
    pub fn set_state(&self, archive: &[u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        let result = (|| -> Result<()> {
            let archive = StateArchive::decode(archive)?;
            inner.contents.clear()?;
            archive.unpack_into(inner.contents.dir())?;
            log::info!(
                "{} - Received state with {} pages",
                self.config.site_id,
                archive.len()
            );
            Ok(())
        })();
        self.logged(result)
    }

    /// Delete every content and empty the pool
    ///
    /// The clock is left alone so identifiers are never reused.
    pub fn clear_working_dir(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        let result = (|| -> Result<()> {
            inner.contents.clear()?;
            inner.pool.initialize(true)?;
            inner.pool.free();
            log::info!("{} - Working directory cleared", self.config.site_id);
            Ok(())
        })();
        self.logged(result)
    }

    // ─── Clock ───────────────────────────────────────────────────────────

    pub fn load_clock(&self) -> Result<()> {
        let result = self.inner.lock().clock.load().map_err(WootError::from);
        self.logged(result)
    }

    pub fn store_clock(&self) -> Result<()> {
        let result = self.inner.lock().clock.store().map_err(WootError::from);
        self.logged(result)
    }

    /// Current clock value
    pub fn clock_value(&self) -> u64 {
        self.inner.lock().clock.value()
    }
}

impl std::fmt::Debug for WootEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WootEngine")
            .field("site_id", &self.config.site_id)
            .field("working_dir", &self.config.working_dir)
            .finish()
    }
}
