use bases_expansion::ExpansionError;
use bases_marketplace::VenueError;
use bases_ports::{LedgerError, MatchingError};
use thiserror::Error;

use crate::config::ConfigError;
use crate::engine::EngineState;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine cannot start from {0:?}")]
    NotIdle(EngineState),

    #[error("Engine is not ticking (state {0:?})")]
    NotTicking(EngineState),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Matching error: {0}")]
    Matching(#[from] MatchingError),

    #[error("Venue error: {0}")]
    Venue(#[from] VenueError),

    #[error("Expansion error: {0}")]
    Expansion(#[from] ExpansionError),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
