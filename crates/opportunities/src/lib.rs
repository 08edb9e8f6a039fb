//! Opportunities
//!
//! Time-boxed investable events. A pluggable policy announces new
//! opportunities each tick; the generator opens them when their window
//! starts, expires them when it ends, and hands them to the expansion
//! planner through an atomic claim.
//!
//! Ordering contract of [`OpportunityGenerator::list_open`]: expected
//! return descending, then earliest expiry. Fundable and standing-gated
//! listings filter that order without changing it.

pub mod assessment;
mod error;
mod generator;
pub mod policy;

pub use assessment::{
    AlertKind, AlertSeverity, AlertThresholds, Assessment, OpportunityAlert, SCENARIO_BAND,
    ScenarioLabel, ScenarioProjection, ScenarioSet, payout_at,
};
pub use error::{OpportunityError, OpportunityResult};
pub use generator::{OpportunityCounts, OpportunityGenerator, OpportunityTick};
pub use policy::{
    NoOpportunities, RandomOpportunities, RandomOpportunitiesConfig, ScheduledOpportunities,
};
