// Failure Tests
// Store outages, timeouts, and half-applied transfers

use coinledger::ledger::{LedgerConfig, LedgerError, LedgerService};
use coinledger::storage::{MemoryStore, StoreError};
use std::sync::Arc;

async fn open_ledger(default_balance: i64) -> (Arc<MemoryStore>, LedgerService) {
    let store = Arc::new(MemoryStore::new());
    let config = LedgerConfig::new().with_default_balance(default_balance);
    let ledger = LedgerService::open(store.clone(), config).await.unwrap();
    (store, ledger)
}

// ============================================================================
// PARTIAL TRANSFERS
// ============================================================================

#[tokio::test]
async fn test_second_write_failure_is_partial_transfer() {
    let (store, ledger) = open_ledger(10).await;
    ledger.resolve_account("Ash").await.unwrap();
    ledger.resolve_account("Misty").await.unwrap();

    // Source write lands, destination write fails
    store.fail_puts_after(1);
    let err = ledger.transfer("Ash", "Misty", 5).await.unwrap_err();

    match err {
        LedgerError::PartialTransferFailure { from, to, amount, .. } => {
            assert_eq!(from, "ash");
            assert_eq!(to, "misty");
            assert_eq!(amount, 5);
        }
        other => panic!("expected partial transfer failure, got {other}"),
    }

    store.recover();
    assert_eq!(ledger.get_balance("ash").await.unwrap(), 5);
    assert_eq!(ledger.get_balance("misty").await.unwrap(), 10);
}

#[tokio::test]
async fn test_first_write_failure_changes_nothing() {
    let (store, ledger) = open_ledger(10).await;
    ledger.resolve_account("ash").await.unwrap();
    ledger.resolve_account("misty").await.unwrap();

    store.fail_puts_after(0);
    let err = ledger.transfer("ash", "misty", 5).await.unwrap_err();

    assert!(matches!(err, LedgerError::StoreUnavailable(StoreError::Unavailable(_))));
    store.recover();
    assert_eq!(ledger.get_balance("ash").await.unwrap(), 10);
    assert_eq!(ledger.get_balance("misty").await.unwrap(), 10);
}

#[tokio::test]
async fn test_source_flush_failure_is_partial_transfer() {
    let (store, ledger) = open_ledger(10).await;
    ledger.resolve_account("ash").await.unwrap();
    ledger.resolve_account("misty").await.unwrap();

    // The debit put lands but its flush fails
    store.fail_next_flushes(1);
    let err = ledger.transfer("ash", "misty", 5).await.unwrap_err();

    assert!(matches!(err, LedgerError::PartialTransferFailure { amount: 5, .. }));
    assert!(!err.is_transient());
    assert_eq!(ledger.get_balance("ash").await.unwrap(), 5);
    assert_eq!(ledger.get_balance("misty").await.unwrap(), 10);
}

#[tokio::test]
async fn test_batch_flush_failure_is_not_retryable() {
    let store = Arc::new(MemoryStore::new().with_atomic_batches());
    let config = LedgerConfig::new().with_default_balance(10);
    let ledger = LedgerService::open(store.clone(), config).await.unwrap();
    ledger.resolve_account("ash").await.unwrap();
    ledger.resolve_account("misty").await.unwrap();

    store.fail_next_flushes(1);
    let err = ledger.transfer("ash", "misty", 5).await.unwrap_err();

    assert!(matches!(err, LedgerError::WriteUnconfirmed { .. }));
    assert!(!err.is_transient());
    // Both records landed together; the total is intact
    let ash = ledger.get_balance("ash").await.unwrap();
    let misty = ledger.get_balance("misty").await.unwrap();
    assert_eq!((ash, misty), (5, 15));
}

#[tokio::test]
async fn test_batch_put_failure_changes_nothing() {
    let store = Arc::new(MemoryStore::new().with_atomic_batches());
    let config = LedgerConfig::new().with_default_balance(10);
    let ledger = LedgerService::open(store.clone(), config).await.unwrap();
    ledger.resolve_account("ash").await.unwrap();
    ledger.resolve_account("misty").await.unwrap();

    store.fail_puts_after(0);
    let err = ledger.transfer("ash", "misty", 5).await.unwrap_err();

    assert!(err.is_transient());
    store.recover();
    assert_eq!(ledger.get_balance("ash").await.unwrap(), 10);
    assert_eq!(ledger.get_balance("misty").await.unwrap(), 10);
}

// ============================================================================
// UNCONFIRMED WRITES
// ============================================================================

#[tokio::test]
async fn test_credit_flush_failure_is_not_retryable() {
    let (store, ledger) = open_ledger(10).await;
    ledger.resolve_account("ash").await.unwrap();

    store.fail_next_flushes(1);
    let err = ledger.credit("ash", 5).await.unwrap_err();

    assert!(matches!(err, LedgerError::WriteUnconfirmed { .. }));
    assert!(!err.is_transient());
    assert_eq!(ledger.get_balance("ash").await.unwrap(), 15);
}

#[tokio::test]
async fn test_rename_flush_failure_tracks_stored_name() {
    let (store, ledger) = open_ledger(0).await;

    store.fail_next_flushes(1);
    let err = ledger.set_currency_name("gems").await.unwrap_err();

    assert!(matches!(err, LedgerError::WriteUnconfirmed { .. }));
    assert_eq!(ledger.currency_name(), "gems");
}

// ============================================================================
// OUTAGES
// ============================================================================

#[tokio::test]
async fn test_failed_debit_is_transient_and_retryable() {
    let (store, ledger) = open_ledger(10).await;
    ledger.resolve_account("ash").await.unwrap();

    store.fail_all();
    let err = ledger.debit("ash", 4).await.unwrap_err();
    assert!(err.is_transient());

    store.recover();
    assert_eq!(ledger.get_balance("ash").await.unwrap(), 10);
    assert_eq!(ledger.debit("ash", 4).await.unwrap().balance(), 6);
}

#[tokio::test]
async fn test_failed_rename_keeps_cached_name() {
    let (store, ledger) = open_ledger(0).await;

    store.fail_all();
    assert!(ledger.set_currency_name("gems").await.is_err());
    assert_eq!(ledger.currency_name(), "coins");
}

#[tokio::test]
async fn test_failed_clear_keeps_accounts() {
    let (store, ledger) = open_ledger(10).await;
    ledger.credit("ash", 1).await.unwrap();

    store.fail_all();
    assert!(ledger.clear_all_accounts().await.is_err());

    store.recover();
    assert_eq!(ledger.get_balance("ash").await.unwrap(), 11);
}

// ============================================================================
// TIMEOUTS
// ============================================================================

#[tokio::test]
async fn test_slow_store_times_out() {
    let store = Arc::new(MemoryStore::new().with_delay_ms(200));
    let config = LedgerConfig::new().with_store_timeout_ms(10);

    let err = LedgerService::open(store, config).await.err().unwrap();

    assert!(matches!(err, LedgerError::StoreUnavailable(StoreError::Timeout(10))));
    assert!(err.is_transient());
}
