// Ledger records - Account and the currency singleton

use serde::{Deserialize, Serialize};

/// Key prefixes for organizing data
pub(crate) mod keys {
    pub const ACCOUNT_PREFIX: &str = "account:";
    pub const CURRENCY: &str = "config:currency";

    /// Store key for a normalized account id
    pub fn account(normalized_id: &str) -> String {
        format!("{}{}", ACCOUNT_PREFIX, normalized_id)
    }
}

/// Canonical form of a user identifier: ASCII-lowercased, `[a-z0-9]` only
///
/// "Ash Ketchum", "ash-ketchum" and "ASHKETCHUM" all map to "ashketchum".
pub fn normalize_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// A user's balance record
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    display_id: String,
    normalized_id: String,
    balance: i64,
}

impl Account {
    pub(crate) fn new(display_id: &str, normalized_id: String, balance: i64) -> Self {
        Self {
            display_id: display_id.to_string(),
            normalized_id,
            balance,
        }
    }

    /// The identifier as first supplied, for display only
    pub fn display_id(&self) -> &str {
        &self.display_id
    }

    /// The lookup key
    pub fn normalized_id(&self) -> &str {
        &self.normalized_id
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub(crate) fn set_balance(&mut self, balance: i64) {
        self.balance = balance;
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        postcard::to_allocvec(self).unwrap_or_default()
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

/// Process-wide currency settings, stored under a reserved key
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyConfig {
    name: String,
}

impl CurrencyConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        postcard::to_allocvec(self).unwrap_or_default()
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}
