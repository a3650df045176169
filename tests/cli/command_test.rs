// Command Tests
// Argument parsing and replies for the economy commands

use clap::Parser;
use coinledger::cli::{execute, Cli, Command};
use coinledger::ledger::{LedgerError, LedgerService};
use coinledger::storage::MemoryStore;
use std::sync::Arc;

fn parse(args: &[&str]) -> Cli {
    let mut argv = vec!["coinledger", "--default-balance", "10"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

async fn ledger_for(cli: &Cli) -> LedgerService {
    LedgerService::open(Arc::new(MemoryStore::new()), cli.config())
        .await
        .unwrap()
}

// ============================================================================
// PARSING
// ============================================================================

#[test]
fn test_parse_defaults() {
    let cli = Cli::try_parse_from(["coinledger", "currency"]).unwrap();

    assert_eq!(cli.default_balance, 0);
    assert_eq!(cli.currency, "coins");
    assert_eq!(cli.command, Command::Currency);
    assert!(cli.config().validate().is_ok());
}

#[test]
fn test_parse_transfer() {
    let cli = parse(&["transfer", "Ash", "Misty", "15"]);

    assert_eq!(
        cli.command,
        Command::Transfer {
            from: "Ash".to_string(),
            to: "Misty".to_string(),
            amount: 15,
        }
    );
}

#[test]
fn test_parse_rejects_non_numeric_amount() {
    assert!(Cli::try_parse_from(["coinledger", "give", "ash", "lots"]).is_err());
}

// ============================================================================
// REPLIES
// ============================================================================

#[tokio::test]
async fn test_give_and_take_replies() {
    let cli = parse(&["give", "Ash", "5"]);
    let ledger = ledger_for(&cli).await;

    let reply = execute(&ledger, &cli.command).await.unwrap();
    assert_eq!(reply, "Gave 5 coins to Ash. New balance for Ash: 15 coins");

    let take = Command::Take {
        user: "Ash".to_string(),
        amount: 20,
    };
    assert!(matches!(
        execute(&ledger, &take).await,
        Err(LedgerError::InsufficientFunds { .. })
    ));
}

#[tokio::test]
async fn test_negative_give_rejected() {
    let cli = parse(&["give", "ash", "-5"]);
    let ledger = ledger_for(&cli).await;

    assert!(matches!(
        execute(&ledger, &cli.command).await,
        Err(LedgerError::InvalidAmount(-5))
    ));
}

#[tokio::test]
async fn test_transfer_and_balance_replies() {
    let cli = parse(&["transfer", "Ash", "Misty", "4"]);
    let ledger = ledger_for(&cli).await;

    let reply = execute(&ledger, &cli.command).await.unwrap();
    assert_eq!(reply, "Ash transferred 4 coins to Misty. New balance for Ash: 6 coins");

    let balance = Command::Balance {
        user: "Misty".to_string(),
    };
    assert_eq!(
        execute(&ledger, &balance).await.unwrap(),
        "Misty's balance is 14 coins."
    );
}

#[tokio::test]
async fn test_set_currency_joins_words() {
    let cli = parse(&["set-currency", "Poke", "Dollars"]);
    let ledger = ledger_for(&cli).await;

    let reply = execute(&ledger, &cli.command).await.unwrap();

    assert_eq!(reply, "Currency name has been changed to \"Poke Dollars\".");
    assert_eq!(
        execute(&ledger, &Command::Currency).await.unwrap(),
        "The currency is Poke Dollars."
    );
}

#[tokio::test]
async fn test_delete_and_clear_replies() {
    let cli = parse(&["delete-user", "Ash Ketchum"]);
    let ledger = ledger_for(&cli).await;
    ledger.credit("ashketchum", 1).await.unwrap();
    ledger.credit("brock", 1).await.unwrap();

    let reply = execute(&ledger, &cli.command).await.unwrap();
    assert_eq!(reply, "Account for 'ashketchum' has been deleted.");

    let clear = Command::ClearData { all: false };
    assert_eq!(
        execute(&ledger, &clear).await.unwrap(),
        "All accounts have been deleted (1 removed)."
    );
}

#[tokio::test]
async fn test_has_balance_reply() {
    let cli = parse(&["has-balance", "ash", "10"]);
    let ledger = ledger_for(&cli).await;

    assert_eq!(
        execute(&ledger, &cli.command).await.unwrap(),
        "ash has at least 10 coins."
    );

    let more = Command::HasBalance {
        user: "ash".to_string(),
        amount: 11,
    };
    assert_eq!(
        execute(&ledger, &more).await.unwrap(),
        "ash does not have 11 coins."
    );
}
