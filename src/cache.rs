//! Process-wide dataset cache keyed by source fingerprint
//!
//! An entry is written once per fingerprint and only read afterwards. Hits
//! take the map's read lock only; the write lock is taken to create the slot
//! for a new fingerprint and retire stale ones. The load itself runs inside
//! the slot's `OnceCell`, so concurrent callers for the same fingerprint
//! share one load while callers for other sources are not blocked.

use once_cell::sync::{Lazy, OnceCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use crate::data::{self, Dataset};
use crate::error::DataFormatError;

static GLOBAL: Lazy<DatasetCache> = Lazy::new(DatasetCache::new);

/// Identity of a source at one point in time.
///
/// A change to the file's modification time or length yields a new
/// fingerprint, and with it a fresh cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
    pub len: u64,
}

impl Fingerprint {
    pub fn of(path: &Path) -> Result<Self, DataFormatError> {
        let unreadable = |source| DataFormatError::Unreadable {
            path: path.to_path_buf(),
            source,
        };
        let canonical = path.canonicalize().map_err(unreadable)?;
        let meta = std::fs::metadata(&canonical).map_err(unreadable)?;

        Ok(Self {
            path: canonical,
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

type Slot = Arc<OnceCell<Arc<Dataset>>>;

#[derive(Debug, Default)]
pub struct DatasetCache {
    entries: RwLock<HashMap<Fingerprint, Slot>>,
    loads: AtomicUsize,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared instance used by the CLI.
    pub fn global() -> &'static DatasetCache {
        &GLOBAL
    }

    /// Return the dataset for `path`, loading it on the first request for
    /// the current fingerprint.
    ///
    /// A failed load leaves the slot empty, so the next call retries.
    pub fn load(&self, path: &Path) -> Result<Arc<Dataset>, DataFormatError> {
        let fingerprint = Fingerprint::of(path)?;
        let slot = self.slot(&fingerprint);

        if let Some(dataset) = slot.get() {
            log::debug!("dataset cache hit for {}", fingerprint.path.display());
            return Ok(Arc::clone(dataset));
        }

        let dataset = slot.get_or_try_init(|| {
            log::debug!("dataset cache miss for {}", fingerprint.path.display());
            self.loads.fetch_add(1, Ordering::SeqCst);
            data::load_dataset(&fingerprint.path).map(Arc::new)
        })?;

        Ok(Arc::clone(dataset))
    }

    /// Find or create the slot for a fingerprint, retiring entries for the
    /// same path whose fingerprint is stale.
    fn slot(&self, fingerprint: &Fingerprint) -> Slot {
        if let Some(slot) = self.read().get(fingerprint) {
            return Arc::clone(slot);
        }

        let mut entries = self.write();
        // another caller may have created it between the two locks
        if let Some(slot) = entries.get(fingerprint) {
            return Arc::clone(slot);
        }

        let before = entries.len();
        entries.retain(|key, _| key.path != fingerprint.path);
        if entries.len() < before {
            log::info!(
                "source {} changed, dropping stale dataset",
                fingerprint.path.display()
            );
        }

        Arc::clone(entries.entry(fingerprint.clone()).or_default())
    }

    /// Number of loads performed so far (cache misses that ran the loader).
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // The map holds no invariant a panicking holder could break, so a
    // poisoned lock is recovered rather than propagated.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Fingerprint, Slot>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Fingerprint, Slot>> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
