// Key-value storage for quote snapshots and session state
// SQLite when it has to survive a restart, a plain map when it doesn't

pub mod memory;
pub mod store;

pub use memory::MemoryStore;
pub use store::{KeyValueStore, SqliteStore, StoreError};
