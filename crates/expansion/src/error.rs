use bases_core::{AccountId, Amount, CommitmentId, OpportunityId};
use bases_opportunities::OpportunityError;
use bases_ports::LedgerError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpansionError {
    #[error("Opportunity {0} is not open for commitment")]
    NotOpen(OpportunityId),

    #[error("Opportunity not found: {0}")]
    UnknownOpportunity(OpportunityId),

    #[error("Insufficient funds in {account}: requested {requested}, available {available}")]
    InsufficientFunds {
        account: AccountId,
        requested: Amount,
        available: Amount,
    },

    #[error("Commitment not found: {0}")]
    UnknownCommitment(CommitmentId),

    #[error("Commitment {0} already settled")]
    AlreadyMatured(CommitmentId),

    #[error("Ledger error: {0}")]
    Ledger(LedgerError),
}

impl From<LedgerError> for ExpansionError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds {
                account,
                requested,
                available,
            } => ExpansionError::InsufficientFunds {
                account,
                requested,
                available,
            },
            other => ExpansionError::Ledger(other),
        }
    }
}

impl From<OpportunityError> for ExpansionError {
    fn from(err: OpportunityError) -> Self {
        match err {
            OpportunityError::NotFound(id) => ExpansionError::UnknownOpportunity(id),
            OpportunityError::NotOpen { id, .. } => ExpansionError::NotOpen(id),
            OpportunityError::Funding(ledger) => ledger.into(),
        }
    }
}

pub type ExpansionResult<T> = std::result::Result<T, ExpansionError>;
