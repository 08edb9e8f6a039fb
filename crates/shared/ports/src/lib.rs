//! SupportingBases Ports
//!
//! Port definitions (traits) for the simulation core.
//! These define the boundaries between the subsystems and the pluggable
//! strategies injected into them: the matching rule used by the venue,
//! the opportunity generation policy and the maturity outcome policy.

mod error;
mod matching;
mod policy;

pub use error::{LedgerError, LedgerResult, MatchingError, MatchingResult};
pub use matching::{Fill, MatchingAlgorithm};
pub use policy::{GenerationContext, MaturityOutcome, MaturityPolicy, OpportunityPolicy};
