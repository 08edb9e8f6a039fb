//! Expansion
//!
//! Long-running capital commitments. An account commits to an open
//! opportunity, which reserves the required capital in the ledger; at the
//! maturity tick a pluggable policy decides the outcome:
//!
//! - success: the capital is drawn down to the market account and
//!   `capital * (1 + expected return)` is paid back, and any instrument the
//!   opportunity unlocks is listed on the venue
//! - failure: the reservation is released and `capital * loss_fraction`
//!   goes to the market account
//!
//! Amounts are rounded half away from zero to the minor unit.

mod error;
pub mod maturity;
mod planner;

pub use error::{ExpansionError, ExpansionResult};
pub use maturity::{AlwaysFail, AlwaysSucceed, ProbabilisticMaturity};
pub use planner::{CommitmentCounts, ExpansionPlanner, ExpansionTick, Maturation, Settlement};
