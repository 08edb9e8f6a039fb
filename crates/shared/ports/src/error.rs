use bases_core::{AccountId, Amount};
use thiserror::Error;

/// Errors raised by the ledger. Shared by every subsystem that moves funds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient funds in {account}: requested {requested}, available {available}")]
    InsufficientFunds {
        account: AccountId,
        requested: Amount,
        available: Amount,
    },

    #[error("Account is closed: {0}")]
    AccountClosed(AccountId),

    #[error("Amount must be positive, got {0}")]
    InvalidAmount(Amount),

    #[error("Cannot release {requested} from {account}: only {reserved} reserved")]
    ReservationUnderflow {
        account: AccountId,
        requested: Amount,
        reserved: Amount,
    },

    #[error("Account {0} still holds reserved funds")]
    ReservedFundsOutstanding(AccountId),

    #[error("Operation not permitted on the market account: {0}")]
    MarketAccount(&'static str),

    #[error("Balance overflow on account {0}")]
    Overflow(AccountId),
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Domain-level errors for matching operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchingError {
    #[error("Orders cannot match: {0}")]
    CannotMatch(String),

    #[error("No quantity to match")]
    NoQuantity,

    #[error("Unknown matching algorithm: {0}")]
    UnknownAlgorithm(String),
}

pub type MatchingResult<T> = std::result::Result<T, MatchingError>;
