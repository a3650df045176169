// Command surface - the economy commands exposed by the binary
// Parses arguments with clap and renders one-line replies

use crate::ledger::{normalize_id, LedgerConfig, LedgerError, LedgerService};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "coinledger", version, about = "Durable balance ledger for chat economies")]
pub struct Cli {
    /// Directory holding the ledger database
    #[arg(long, default_value = "./ledger-data")]
    pub data_dir: PathBuf,

    /// Balance for accounts on first reference
    #[arg(long, default_value_t = 0)]
    pub default_balance: i64,

    /// Currency name used when the store has none yet
    #[arg(long, default_value = "coins")]
    pub currency: String,

    /// Timeout for each store call in milliseconds
    #[arg(long, default_value_t = 5_000)]
    pub timeout_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn config(&self) -> LedgerConfig {
        LedgerConfig::new()
            .with_default_balance(self.default_balance)
            .with_default_currency(&self.currency)
            .with_store_timeout_ms(self.timeout_ms)
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show a user's balance
    Balance { user: String },

    /// Give funds to a user
    Give {
        user: String,
        #[arg(allow_hyphen_values = true)]
        amount: i64,
    },

    /// Take funds from a user
    Take {
        user: String,
        #[arg(allow_hyphen_values = true)]
        amount: i64,
    },

    /// Move funds from one user to another
    Transfer {
        from: String,
        to: String,
        #[arg(allow_hyphen_values = true)]
        amount: i64,
    },

    /// Check whether a user holds at least an amount
    HasBalance {
        user: String,
        #[arg(allow_hyphen_values = true)]
        amount: i64,
    },

    /// Delete a user's account
    DeleteUser { user: String },

    /// Delete every account; with --all also reset the currency name
    ClearData {
        #[arg(long)]
        all: bool,
    },

    /// Rename the currency
    SetCurrency {
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },

    /// Show the currency name
    Currency,
}

/// Run one command and render the reply
pub async fn execute(ledger: &LedgerService, command: &Command) -> Result<String, LedgerError> {
    match command {
        Command::Balance { user } => {
            let balance = ledger.get_balance(user).await?;
            Ok(format!(
                "{}'s balance is {} {}.",
                user,
                balance,
                ledger.currency_name()
            ))
        }
        Command::Give { user, amount } => {
            let account = ledger.credit(user, *amount).await?;
            let currency = ledger.currency_name();
            Ok(format!(
                "Gave {} {} to {}. New balance for {}: {} {}",
                amount,
                currency,
                user,
                user,
                account.balance(),
                currency
            ))
        }
        Command::Take { user, amount } => {
            let account = ledger.debit(user, *amount).await?;
            let currency = ledger.currency_name();
            Ok(format!(
                "Took {} {} from {}. New balance for {}: {} {}",
                amount,
                currency,
                user,
                user,
                account.balance(),
                currency
            ))
        }
        Command::Transfer { from, to, amount } => {
            let (source, _) = ledger.transfer(from, to, *amount).await?;
            let currency = ledger.currency_name();
            Ok(format!(
                "{} transferred {} {} to {}. New balance for {}: {} {}",
                from,
                amount,
                currency,
                to,
                from,
                source.balance(),
                currency
            ))
        }
        Command::HasBalance { user, amount } => {
            let currency = ledger.currency_name();
            if ledger.has_balance(user, *amount).await? {
                Ok(format!("{} has at least {} {}.", user, amount, currency))
            } else {
                Ok(format!("{} does not have {} {}.", user, amount, currency))
            }
        }
        Command::DeleteUser { user } => {
            ledger.delete_account(user).await?;
            Ok(format!("Account for '{}' has been deleted.", normalize_id(user)))
        }
        Command::ClearData { all: true } => {
            ledger.clear_all_data().await?;
            Ok("All economy data has been deleted.".to_string())
        }
        Command::ClearData { all: false } => {
            let removed = ledger.clear_all_accounts().await?;
            Ok(format!("All accounts have been deleted ({} removed).", removed))
        }
        Command::SetCurrency { name } => {
            let name = name.join(" ");
            ledger.set_currency_name(&name).await?;
            Ok(format!(
                "Currency name has been changed to \"{}\".",
                ledger.currency_name()
            ))
        }
        Command::Currency => Ok(format!("The currency is {}.", ledger.currency_name())),
    }
}
