// Ledger module - THE BALANCES
// Accounts, currency settings, and the service that mutates them

mod account;
mod config;
mod locks;
mod service;

pub use account::{normalize_id, Account, CurrencyConfig};
pub use config::LedgerConfig;
pub use service::{LedgerError, LedgerService, Normalizer};
