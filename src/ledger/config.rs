// Ledger configuration

use super::service::LedgerError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings fixed when the service is opened
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Balance given to an account when it is first referenced
    pub default_balance: i64,
    /// Currency name seeded into an empty store
    pub default_currency: String,
    /// Upper bound for a single store call in milliseconds
    pub store_timeout_ms: u64,
    /// Flush the store after every mutation
    pub flush_on_write: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_balance: 0,
            default_currency: "coins".to_string(),
            store_timeout_ms: 5_000,
            flush_on_write: true,
        }
    }
}

impl LedgerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_balance(mut self, balance: i64) -> Self {
        self.default_balance = balance;
        self
    }

    pub fn with_default_currency(mut self, name: &str) -> Self {
        self.default_currency = name.to_string();
        self
    }

    pub fn with_store_timeout_ms(mut self, ms: u64) -> Self {
        self.store_timeout_ms = ms;
        self
    }

    pub fn with_flush_on_write(mut self, flush: bool) -> Self {
        self.flush_on_write = flush;
        self
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.default_balance < 0 {
            return Err(LedgerError::InvalidConfig(
                "default_balance cannot be negative".to_string(),
            ));
        }
        if self.default_currency.trim().is_empty() {
            return Err(LedgerError::InvalidConfig(
                "default_currency cannot be empty".to_string(),
            ));
        }
        if self.store_timeout_ms == 0 {
            return Err(LedgerError::InvalidConfig(
                "store_timeout_ms cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}
