// LedgerService - balance operations over a LedgerStore
//
// Every mutation runs under the per-key lock of the account(s) it touches,
// so read-modify-write sequences on one account never interleave. Mutations
// also hold the wipe gate shared; clearing holds it exclusively.

use super::account::{keys, normalize_id, Account, CurrencyConfig};
use super::config::LedgerConfig;
use super::locks::KeyLocks;
use crate::storage::{LedgerStore, StoreError};
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::RwLock as AsyncRwLock;
use tracing::{debug, error, info, warn};

/// Errors that can occur during ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: i64, required: i64 },

    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    #[error("Currency name cannot be empty")]
    InvalidName,

    #[error("Invalid account id: {0:?}")]
    InvalidAccountId(String),

    #[error("Balance would overflow")]
    BalanceOverflow,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("Write to {key} may have landed but was not confirmed: {reason}")]
    WriteUnconfirmed { key: String, reason: String },

    #[error("Corrupt record under {key}: {reason}")]
    CorruptRecord { key: String, reason: String },

    #[error("Transfer of {amount} from {from} to {to} may have debited the source without crediting the destination: {reason}")]
    PartialTransferFailure {
        from: String,
        to: String,
        amount: i64,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LedgerError {
    /// Whether retrying the same call is safe and may succeed
    ///
    /// Only failures where no write can have landed qualify.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::StoreUnavailable(_))
    }
}

/// Maps a raw identifier to its lookup key
pub type Normalizer = fn(&str) -> String;

/// The ledger: accounts plus the currency name, persisted through a store
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    config: LedgerConfig,
    normalize: Normalizer,
    currency: RwLock<String>,
    locks: KeyLocks,
    gate: AsyncRwLock<()>,
}

impl LedgerService {
    /// Open the ledger, loading the currency name or seeding the default one
    pub async fn open(
        store: Arc<dyn LedgerStore>,
        config: LedgerConfig,
    ) -> Result<Self, LedgerError> {
        config.validate()?;

        let service = Self {
            currency: RwLock::new(config.default_currency.clone()),
            store,
            config,
            normalize: normalize_id,
            locks: KeyLocks::new(),
            gate: AsyncRwLock::new(()),
        };

        match service.bounded(service.store.get(keys::CURRENCY)).await? {
            Some(bytes) => {
                let stored = CurrencyConfig::from_bytes(&bytes).map_err(|e| {
                    LedgerError::CorruptRecord {
                        key: keys::CURRENCY.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                service.set_cached_currency(stored.name());
            }
            None => {
                let default = CurrencyConfig::new(&service.config.default_currency);
                service.write(keys::CURRENCY, default.to_bytes()).await?;
            }
        }

        info!(
            currency = %service.currency_name(),
            default_balance = service.config.default_balance,
            "ledger opened"
        );
        Ok(service)
    }

    /// Replace the identifier normalization rules
    pub fn with_normalizer(mut self, normalize: Normalizer) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ========================================================================
    // ACCOUNTS
    // ========================================================================

    /// Fetch an account, creating it at the default balance on first reference
    pub async fn resolve_account(&self, raw_id: &str) -> Result<Account, LedgerError> {
        let (normalized, key) = self.account_key(raw_id)?;
        if let Some(account) = self.load(&key).await? {
            return Ok(account);
        }

        let _gate = self.gate.read().await;
        let _guard = self.locks.lock(&key).await;
        self.resolve_locked(raw_id, normalized, &key).await
    }

    /// Check for an account without creating it
    pub async fn account_exists(&self, raw_id: &str) -> Result<bool, LedgerError> {
        let (_, key) = self.account_key(raw_id)?;
        Ok(self.load(&key).await?.is_some())
    }

    pub async fn get_balance(&self, raw_id: &str) -> Result<i64, LedgerError> {
        Ok(self.resolve_account(raw_id).await?.balance())
    }

    /// Whether the balance covers `amount`. Any amount is accepted, so a
    /// negative one is always covered.
    pub async fn has_balance(&self, raw_id: &str, amount: i64) -> Result<bool, LedgerError> {
        Ok(self.get_balance(raw_id).await? >= amount)
    }

    /// Add `amount` to an account
    pub async fn credit(&self, raw_id: &str, amount: i64) -> Result<Account, LedgerError> {
        check_amount(amount)?;
        let (normalized, key) = self.account_key(raw_id)?;
        let _gate = self.gate.read().await;
        let _guard = self.locks.lock(&key).await;

        let mut account = self.resolve_locked(raw_id, normalized, &key).await?;
        if amount == 0 {
            return Ok(account);
        }
        let balance = account
            .balance()
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;
        account.set_balance(balance);
        self.write(&key, account.to_bytes()).await?;

        info!(account = %account.normalized_id(), amount, balance, "credited");
        Ok(account)
    }

    /// Remove `amount` from an account, refusing to go below zero
    pub async fn debit(&self, raw_id: &str, amount: i64) -> Result<Account, LedgerError> {
        check_amount(amount)?;
        let (normalized, key) = self.account_key(raw_id)?;
        let _gate = self.gate.read().await;
        let _guard = self.locks.lock(&key).await;

        let mut account = self.resolve_locked(raw_id, normalized, &key).await?;
        if account.balance() < amount {
            warn!(
                account = %account.normalized_id(),
                available = account.balance(),
                required = amount,
                "debit rejected"
            );
            return Err(LedgerError::InsufficientFunds {
                available: account.balance(),
                required: amount,
            });
        }
        if amount == 0 {
            return Ok(account);
        }
        account.set_balance(account.balance() - amount);
        self.write(&key, account.to_bytes()).await?;

        info!(account = %account.normalized_id(), amount, balance = account.balance(), "debited");
        Ok(account)
    }

    /// Move `amount` between two accounts, returning (source, destination)
    ///
    /// Both accounts are resolved (and created if needed) before the funds
    /// check. When both ids normalize to the same account nothing is written
    /// and the balance is unchanged, but the funds check still applies.
    pub async fn transfer(
        &self,
        from_raw: &str,
        to_raw: &str,
        amount: i64,
    ) -> Result<(Account, Account), LedgerError> {
        check_amount(amount)?;
        let (from_id, from_key) = self.account_key(from_raw)?;
        let (to_id, to_key) = self.account_key(to_raw)?;
        let _gate = self.gate.read().await;
        let _guards = self.locks.lock_pair(&from_key, &to_key).await;

        let mut source = self.resolve_locked(from_raw, from_id, &from_key).await?;
        let mut destination = if from_key == to_key {
            source.clone()
        } else {
            self.resolve_locked(to_raw, to_id, &to_key).await?
        };
        if source.balance() < amount {
            warn!(
                from = %source.normalized_id(),
                available = source.balance(),
                required = amount,
                "transfer rejected"
            );
            return Err(LedgerError::InsufficientFunds {
                available: source.balance(),
                required: amount,
            });
        }
        if from_key == to_key || amount == 0 {
            return Ok((source, destination));
        }
        let credited = destination
            .balance()
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow)?;
        source.set_balance(source.balance() - amount);
        destination.set_balance(credited);

        if self.store.atomic_batches() {
            let label = format!("{}+{}", from_key, to_key);
            let entries = vec![
                (from_key, source.to_bytes()),
                (to_key, destination.to_bytes()),
            ];
            match self.bounded(self.store.put_batch(entries)).await {
                Ok(()) => {}
                Err(LedgerError::StoreUnavailable(e @ StoreError::Timeout(_))) => {
                    return Err(unconfirmed(&label, e));
                }
                Err(e) => return Err(e),
            }
            self.flush_if_configured()
                .await
                .map_err(|e| unconfirmed(&label, e))?;
        } else {
            match self.write(&from_key, source.to_bytes()).await {
                Ok(()) => {}
                Err(e @ LedgerError::WriteUnconfirmed { .. }) => {
                    return Err(partial_transfer(&source, &destination, amount, e));
                }
                Err(e) => return Err(e),
            }
            if let Err(e) = self.write(&to_key, destination.to_bytes()).await {
                return Err(partial_transfer(&source, &destination, amount, e));
            }
        }

        info!(
            from = %source.normalized_id(),
            to = %destination.normalized_id(),
            amount,
            "transferred"
        );
        Ok((source, destination))
    }

    /// Remove an account. Absent accounts are fine.
    pub async fn delete_account(&self, raw_id: &str) -> Result<(), LedgerError> {
        let (normalized, key) = self.account_key(raw_id)?;
        let _gate = self.gate.read().await;
        let _guard = self.locks.lock(&key).await;

        // Deleting twice is harmless, so flush errors stay retryable
        self.bounded(self.store.delete(&key)).await?;
        self.flush_if_configured().await?;
        info!(account = %normalized, "account deleted");
        Ok(())
    }

    /// Remove every account record, keeping the currency settings
    pub async fn clear_all_accounts(&self) -> Result<usize, LedgerError> {
        let _gate = self.gate.write().await;

        let removed = self
            .bounded(self.store.delete_prefix(keys::ACCOUNT_PREFIX))
            .await?;
        self.flush_if_configured().await?;
        info!(removed, "all accounts cleared");
        Ok(removed)
    }

    /// Wipe the whole store, then reseed the default currency name
    pub async fn clear_all_data(&self) -> Result<(), LedgerError> {
        let _gate = self.gate.write().await;

        self.bounded(self.store.clear()).await?;
        let default = CurrencyConfig::new(&self.config.default_currency);
        self.set_cached_currency(default.name());
        self.write(keys::CURRENCY, default.to_bytes()).await?;

        info!(currency = %default.name(), "all ledger data cleared");
        Ok(())
    }

    // ========================================================================
    // CURRENCY
    // ========================================================================

    pub fn currency_name(&self) -> String {
        self.currency
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Rename the currency. Surrounding whitespace is dropped.
    pub async fn set_currency_name(&self, name: &str) -> Result<(), LedgerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::InvalidName);
        }
        let _gate = self.gate.read().await;
        let _guard = self.locks.lock(keys::CURRENCY).await;

        match self
            .write(keys::CURRENCY, CurrencyConfig::new(name).to_bytes())
            .await
        {
            Ok(()) => self.set_cached_currency(name),
            Err(e @ LedgerError::WriteUnconfirmed { .. }) => {
                self.reload_currency().await;
                return Err(e);
            }
            Err(e) => return Err(e),
        }

        info!(currency = %name, "currency renamed");
        Ok(())
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn account_key(&self, raw_id: &str) -> Result<(String, String), LedgerError> {
        let normalized = (self.normalize)(raw_id);
        if normalized.is_empty() {
            return Err(LedgerError::InvalidAccountId(raw_id.to_string()));
        }
        let key = keys::account(&normalized);
        Ok((normalized, key))
    }

    /// Load or create. Caller must hold the key's lock.
    async fn resolve_locked(
        &self,
        raw_id: &str,
        normalized: String,
        key: &str,
    ) -> Result<Account, LedgerError> {
        if let Some(account) = self.load(key).await? {
            return Ok(account);
        }

        let account = Account::new(raw_id, normalized, self.config.default_balance);
        self.write(key, account.to_bytes()).await?;
        debug!(account = %account.normalized_id(), balance = account.balance(), "account created");
        Ok(account)
    }

    async fn load(&self, key: &str) -> Result<Option<Account>, LedgerError> {
        match self.bounded(self.store.get(key)).await? {
            Some(bytes) => Account::from_bytes(&bytes)
                .map(Some)
                .map_err(|e| LedgerError::CorruptRecord {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Put then flush. A timed-out put or a failed flush leaves the write in
    /// doubt and is reported as `WriteUnconfirmed`.
    async fn write(&self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        match self.bounded(self.store.put(key, value)).await {
            Ok(()) => {}
            Err(LedgerError::StoreUnavailable(e @ StoreError::Timeout(_))) => {
                return Err(unconfirmed(key, e));
            }
            Err(e) => return Err(e),
        }
        self.flush_if_configured()
            .await
            .map_err(|e| unconfirmed(key, e))
    }

    async fn flush_if_configured(&self) -> Result<(), LedgerError> {
        if self.config.flush_on_write {
            self.bounded(self.store.flush()).await?;
        }
        Ok(())
    }

    /// Run a store call under the configured timeout
    async fn bounded<T, F>(&self, call: F) -> Result<T, LedgerError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.config.store_timeout(), call).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                warn!(timeout_ms = self.config.store_timeout_ms, "store call timed out");
                Err(StoreError::Timeout(self.config.store_timeout_ms).into())
            }
        }
    }

    /// Re-read the stored currency name into the cache, best effort
    async fn reload_currency(&self) {
        match self.bounded(self.store.get(keys::CURRENCY)).await {
            Ok(Some(bytes)) => match CurrencyConfig::from_bytes(&bytes) {
                Ok(stored) => self.set_cached_currency(stored.name()),
                Err(e) => warn!(error = %e, "stored currency unreadable"),
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "currency reload failed"),
        }
    }

    fn set_cached_currency(&self, name: &str) {
        let mut cached = self.currency.write().unwrap_or_else(|e| e.into_inner());
        *cached = name.to_string();
    }
}

fn unconfirmed(key: &str, reason: impl Display) -> LedgerError {
    LedgerError::WriteUnconfirmed {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn partial_transfer(
    source: &Account,
    destination: &Account,
    amount: i64,
    cause: LedgerError,
) -> LedgerError {
    error!(
        from = %source.normalized_id(),
        to = %destination.normalized_id(),
        amount,
        error = %cause,
        "transfer left source debited without crediting destination"
    );
    LedgerError::PartialTransferFailure {
        from: source.normalized_id().to_string(),
        to: destination.normalized_id().to_string(),
        amount,
        reason: cause.to_string(),
    }
}

/// Negative amounts are rejected; zero is a no-op
fn check_amount(amount: i64) -> Result<(), LedgerError> {
    if amount < 0 {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(())
}
