//! SupportingBases Engine - the tick scheduler
//!
//! Wires the ledger, venue, opportunity generator and expansion planner
//! together and advances them one discrete tick at a time:
//!
//! ```text
//!   start()           step() x N                          halt()
//!  Idle ──────▶ Ticking ──────────────────────────────▶ Halted
//!                  │
//!                  │  1. opportunities.tick(t)   open / expire / generate
//!                  │  2. venue.match_tick()      match and settle trades
//!                  │  3. expansion.tick(t)       mature due commitments
//!                  ▼
//!               t = t + 1
//! ```
//!
//! - **Config**: JSON settings plus injectable policies
//! - **Bootstrap**: builds an idle engine from a config
//! - **Driver**: async loop pacing steps on the tick interval
//! - **Snapshot**: serializable state between ticks

pub mod bootstrap;
pub mod config;
pub mod driver;
pub mod engine;
mod error;
pub mod metrics;
pub mod snapshot;

pub use bootstrap::bootstrap;
pub use config::{
    ConfigError, EngineConfig, InitialAccount, MaturityPolicyConfig, OpportunityPolicyConfig,
    ScheduledEntry, SimulationSettings, load_default_settings, load_settings,
    load_settings_from_str,
};
pub use driver::{DriveSummary, drive};
pub use engine::{EngineState, HaltHandle, SimulationEngine, StepReport};
pub use error::{EngineError, EngineResult};
pub use metrics::SimulationMetrics;
pub use snapshot::SimulationSnapshot;
