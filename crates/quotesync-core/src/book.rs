use rand::seq::SliceRandom;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use crate::categories::CategoryIndex;
use crate::collection::QuoteCollection;
use crate::models::{seed_quotes, CategoryFilter, Quote};
use crate::storage::{DurableStore, EphemeralCache};
use crate::transfer::{ImportBatch, ImportExport, ImportStrictness};
use crate::Result;

/// Application state: the live quote collection plus the stores behind it
///
/// Built once at startup and handed around as a [`SharedBook`]. Every
/// mutation goes through here so the durable snapshot never lags behind.
pub struct QuoteBook {
    quotes: QuoteCollection,
    store: DurableStore,
    session: EphemeralCache,
}

/// Handle shared between the view layer and the sync engine
pub type SharedBook = Arc<Mutex<QuoteBook>>;

/// Lock a shared book. A panic elsewhere doesn't make the quotes invalid,
/// so a poisoned lock is simply taken over.
pub fn lock_book(book: &SharedBook) -> MutexGuard<'_, QuoteBook> {
    book.lock().unwrap_or_else(PoisonError::into_inner)
}

impl QuoteBook {
    /// Load the stored snapshot, or start from the seed set if there isn't a usable one
    pub fn open(store: DurableStore, session: EphemeralCache) -> Self {
        let quotes = match store.load_quotes() {
            Some(quotes) => {
                debug!("Restored {} quotes", quotes.len());
                quotes
            }
            None => {
                info!("No stored quotes, starting from the default set");
                seed_quotes()
            }
        };

        Self {
            quotes: QuoteCollection::from_quotes(quotes),
            store,
            session,
        }
    }

    pub fn into_shared(self) -> SharedBook {
        Arc::new(Mutex::new(self))
    }

    pub fn quotes(&self) -> &QuoteCollection {
        &self.quotes
    }

    /// Owned copy of the current collection
    pub fn snapshot(&self) -> Vec<Quote> {
        self.quotes.as_slice().to_vec()
    }

    pub fn store(&self) -> &DurableStore {
        &self.store
    }

    fn persist(&self) {
        self.store.save_quotes(self.quotes.as_slice());
    }

    pub fn add_quote(&mut self, text: &str, category: &str) -> Result<Quote> {
        let quote = self.quotes.add(text, category)?.clone();
        self.persist();
        info!("Added quote in category {}", quote.category());
        Ok(quote)
    }

    pub fn replace_all(&mut self, quotes: Vec<Quote>) {
        self.quotes.replace_all(quotes);
        self.persist();
    }

    pub fn merge_in(&mut self, quotes: Vec<Quote>) -> usize {
        let added = self.quotes.merge_in(quotes);
        self.persist();
        added
    }

    /// Recomputed on every call
    pub fn categories(&self) -> CategoryIndex {
        CategoryIndex::build(&self.quotes)
    }

    pub fn filtered<'a>(&'a self, filter: &'a CategoryFilter) -> impl Iterator<Item = &'a Quote> + Clone + 'a {
        self.quotes.filter_by_category(filter)
    }

    /// Remembered filter, or `All` if it's unset or points at a category that no longer exists
    pub fn selected_category(&self) -> CategoryFilter {
        self.store
            .load_selected_category()
            .unwrap_or_default()
            .resolve(self.categories().as_slice())
    }

    pub fn select_category(&self, filter: &CategoryFilter) {
        self.store.save_selected_category(filter);
    }

    /// Pick a random quote matching `filter` and remember it as last viewed
    pub fn show_random(&self, filter: &CategoryFilter) -> Option<Quote> {
        let matching: Vec<&Quote> = self.quotes.filter_by_category(filter).collect();
        let picked = matching.choose(&mut rand::thread_rng()).map(|q| (*q).clone())?;
        self.session.set_last_viewed(picked.text());
        Some(picked)
    }

    pub fn last_viewed(&self) -> Option<String> {
        self.session.last_viewed()
    }

    pub fn export_json(&self) -> Result<String> {
        ImportExport::to_json(self.quotes.as_slice())
    }

    /// Parse and merge an import document. Nothing changes unless parsing succeeds.
    pub fn import_json(&mut self, document: &str, strictness: ImportStrictness) -> Result<usize> {
        let batch = ImportExport::parse(document, strictness)?;
        Ok(self.merge_batch(batch))
    }

    /// Same as [`QuoteBook::import_json`], reading the document from a file
    pub fn import_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        strictness: ImportStrictness,
    ) -> Result<usize> {
        let batch = ImportExport::read_file(path, strictness)?;
        Ok(self.merge_batch(batch))
    }

    fn merge_batch(&mut self, batch: ImportBatch) -> usize {
        if batch.skipped > 0 {
            info!("Import skipped {} malformed entries", batch.skipped);
        }
        self.merge_in(batch.quotes)
    }
}
