use bases_core::{AccountId, Amount};
use bases_ports::LedgerError;
use thiserror::Error;

/// Errors returned to venue callers. A failed call leaves no state behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VenueError {
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Insufficient funds in {account}: requested {requested}, available {available}")]
    InsufficientFunds {
        account: AccountId,
        requested: Amount,
        available: Amount,
    },

    #[error("Ledger error: {0}")]
    Ledger(LedgerError),
}

impl From<LedgerError> for VenueError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds {
                account,
                requested,
                available,
            } => VenueError::InsufficientFunds {
                account,
                requested,
                available,
            },
            other => VenueError::Ledger(other),
        }
    }
}

pub type VenueResult<T> = std::result::Result<T, VenueError>;
