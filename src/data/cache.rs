//! Memoized loading keyed by file identity, with at most one parse in flight per key.

use log::debug;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::SystemTime;

use super::loader::{DataLoader, LoadError};
use super::record::Dataset;

/// Identity of a source file's content: canonical path plus size and mtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFingerprint {
    pub path: PathBuf,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

/// Where dataset bytes come from.
pub trait DataSource: Send + Sync {
    fn fingerprint(&self, path: &Path) -> io::Result<SourceFingerprint>;
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystem;

impl DataSource for FileSystem {
    fn fingerprint(&self, path: &Path) -> io::Result<SourceFingerprint> {
        let canonical = fs::canonicalize(path)?;
        let meta = fs::metadata(&canonical)?;
        Ok(SourceFingerprint {
            path: canonical,
            len: meta.len(),
            modified: meta.modified().ok(),
        })
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }
}

/// Result of one load attempt. `retry` marks I/O failures, which are not
/// kept once the attempt finishes.
struct Outcome {
    result: Result<Arc<Dataset>, LoadError>,
    retry: bool,
}

type Slot = Arc<OnceLock<Outcome>>;

/// Caches normalized datasets per [`SourceFingerprint`].
///
/// Concurrent callers for the same key block on a shared slot, so only one of
/// them parses and all observe the same result. A changed file gets a new key
/// and evicts the stale entry for its path. Read failures are handed to the
/// callers waiting on that attempt and then dropped, so the next call reads
/// again.
pub struct DatasetCache<S = FileSystem> {
    loader: DataLoader,
    source: S,
    slots: Mutex<HashMap<SourceFingerprint, Slot>>,
}

impl DatasetCache<FileSystem> {
    pub fn new(loader: DataLoader) -> Self {
        Self::with_source(loader, FileSystem)
    }
}

impl<S: DataSource> DatasetCache<S> {
    pub fn with_source(loader: DataLoader, source: S) -> Self {
        Self {
            loader,
            source,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn loader(&self) -> &DataLoader {
        &self.loader
    }

    /// Load `path`, reusing a previous result while the file is unchanged.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Arc<Dataset>, LoadError> {
        let path = path.as_ref();
        let key = self
            .source
            .fingerprint(path)
            .map_err(|e| LoadError::unreadable(path, e))?;

        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.retain(|k, _| k.path != key.path || *k == key);
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        let mut parsed = false;
        let outcome = slot.get_or_init(|| {
            parsed = true;
            match self.source.read(&key.path) {
                Ok(bytes) => Outcome {
                    result: self.loader.parse(path, &bytes).map(Arc::new),
                    retry: false,
                },
                Err(e) => Outcome {
                    result: Err(LoadError::unreadable(path, e)),
                    retry: true,
                },
            }
        });
        if !parsed {
            debug!("Serving {} from cache", path.display());
        }
        if outcome.retry {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            if slots.get(&key).is_some_and(|current| Arc::ptr_eq(current, &slot)) {
                slots.remove(&key);
            }
        }
        outcome.result.clone()
    }

    /// Drop any cached result for `path`.
    pub fn invalidate(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|k, _| k.path != canonical && k.path != path);
    }

    pub fn clear(&self) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

static GLOBAL_CACHE: Lazy<DatasetCache> = Lazy::new(|| DatasetCache::new(DataLoader::default()));

/// Load and normalize `path` with the default column layout, memoized for the
/// life of the process.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Arc<Dataset>, LoadError> {
    GLOBAL_CACHE.load(path)
}
