use bases_core::{OpportunityId, OpportunityStatus};
use bases_ports::LedgerError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OpportunityError {
    #[error("Opportunity not found: {0}")]
    NotFound(OpportunityId),

    #[error("Opportunity {id} is not open (status {status:?})")]
    NotOpen {
        id: OpportunityId,
        status: OpportunityStatus,
    },

    #[error("Could not fund opportunity: {0}")]
    Funding(#[from] LedgerError),
}

pub type OpportunityResult<T> = std::result::Result<T, OpportunityError>;
