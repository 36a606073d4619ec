// Typed views over the raw key-value stores
use quotesync_cache::{KeyValueStore, MemoryStore, SqliteStore};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::{CategoryFilter, Quote};
use crate::{Error, Result};

pub const QUOTES_KEY: &str = "quotes";
pub const SELECTED_CATEGORY_KEY: &str = "selectedCategory";
pub const LAST_VIEWED_KEY: &str = "lastViewedQuote";

/// Quote snapshot and filter selection, surviving restarts
///
/// Reads never fail from the caller's point of view: missing or corrupt
/// data comes back as `None`. Writes log on failure and carry on.
#[derive(Clone)]
pub struct DurableStore {
    kv: Arc<dyn KeyValueStore>,
}

impl DurableStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// SQLite file at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let store = SqliteStore::open(path)?;
        Ok(Self::new(Arc::new(store)))
    }

    /// Volatile stand-in, for when the database can't be opened
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn load_quotes(&self) -> Option<Vec<Quote>> {
        match self.read_quotes() {
            Ok(quotes) => quotes,
            Err(e) => {
                warn!("Ignoring stored quotes: {}", e);
                None
            }
        }
    }

    fn read_quotes(&self) -> Result<Option<Vec<Quote>>> {
        let Some(raw) = self.kv.get(QUOTES_KEY)? else {
            return Ok(None);
        };

        let quotes: Vec<Quote> =
            serde_json::from_str(&raw).map_err(|e| Error::StorageRead(e.to_string()))?;
        debug!("Loaded {} quotes from durable storage", quotes.len());
        Ok(Some(quotes))
    }

    pub fn save_quotes(&self, quotes: &[Quote]) {
        let result = serde_json::to_string(quotes)
            .map_err(Error::from)
            .and_then(|json| self.kv.set(QUOTES_KEY, &json).map_err(Error::from));

        if let Err(e) = result {
            warn!("Failed to persist {} quotes: {}", quotes.len(), e);
        }
    }

    pub fn load_selected_category(&self) -> Option<CategoryFilter> {
        match self.kv.get(SELECTED_CATEGORY_KEY) {
            Ok(value) => value.map(|v| v.parse().unwrap_or_default()),
            Err(e) => {
                warn!("Ignoring stored category selection: {}", e);
                None
            }
        }
    }

    pub fn save_selected_category(&self, filter: &CategoryFilter) {
        if let Err(e) = self.kv.set(SELECTED_CATEGORY_KEY, filter.as_stored()) {
            warn!("Failed to persist category selection {}: {}", filter, e);
        }
    }
}

/// Session-only memory of the last quote shown
#[derive(Clone)]
pub struct EphemeralCache {
    kv: Arc<dyn KeyValueStore>,
}

impl EphemeralCache {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Fresh, empty cache scoped to this process
    pub fn session() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn last_viewed(&self) -> Option<String> {
        self.kv.get(LAST_VIEWED_KEY).unwrap_or_else(|e| {
            debug!("Session cache read failed: {}", e);
            None
        })
    }

    pub fn set_last_viewed(&self, text: &str) {
        if let Err(e) = self.kv.set(LAST_VIEWED_KEY, text) {
            debug!("Session cache write failed: {}", e);
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.kv.remove(LAST_VIEWED_KEY) {
            debug!("Session cache clear failed: {}", e);
        }
    }
}
