// Core quote handling: the collection, its storage, import/export and server sync
pub mod book;
pub mod categories;
pub mod collection;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod remote;
pub mod storage;
pub mod sync;
pub mod transfer;

pub use book::{lock_book, QuoteBook, SharedBook};
pub use categories::CategoryIndex;
pub use collection::QuoteCollection;
pub use config::{Config, ResolutionPolicy};
pub use error::Error;
pub use models::{seed_quotes, CategoryFilter, Quote};
pub use notify::{ChannelNotifier, Notification, NotificationKind, Notifier, TracingNotifier};
pub use remote::{RemoteSource, ServerSource, DEFAULT_FETCH_LIMIT, SERVER_SYNC_CATEGORY};
pub use storage::{DurableStore, EphemeralCache};
pub use sync::{
    AlwaysAccept, AlwaysDecline, ConflictResolver, Divergence, Resolution, SyncEngine,
    SyncHandle, SyncOutcome, SyncState,
};
pub use transfer::{ImportBatch, ImportExport, ImportStrictness};

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
