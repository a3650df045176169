// Storage module - PERSISTENCE
// Async key-value contract for the ledger, backed by sled or memory

mod memory;
mod store;

pub use memory::MemoryStore;
pub use store::{LedgerStore, SledStore, StorageStats, StoreError};
