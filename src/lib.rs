//! coinledger - a durable single-currency balance ledger
//!
//! Accounts are created lazily at a configured default balance and can be
//! credited, debited, or transferred between, never dropping below zero.
//! Records live in any [`storage::LedgerStore`]; [`storage::SledStore`]
//! is the durable one.

pub mod cli;
pub mod ledger;
pub mod storage;

pub use ledger::{Account, LedgerConfig, LedgerError, LedgerService};
pub use storage::{LedgerStore, MemoryStore, SledStore, StoreError};
