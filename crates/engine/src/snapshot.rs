use bases_core::{Account, ExpansionCommitment, InstrumentId, Opportunity, Order, Tick};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::EngineState;
use crate::metrics::SimulationMetrics;

/// Point-in-time copy of the simulation taken between ticks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    pub run_id: Uuid,
    /// Tick the next step will execute
    pub tick: Tick,
    pub state: EngineState,
    pub started_at: Option<DateTime<Utc>>,
    pub halted_at: Option<DateTime<Utc>>,
    /// Sorted by account id
    pub accounts: Vec<Account>,
    pub open_orders: Vec<Order>,
    pub opportunities: Vec<Opportunity>,
    pub commitments: Vec<ExpansionCommitment>,
    pub halted_instruments: Vec<InstrumentId>,
    pub metrics: SimulationMetrics,
}

impl SimulationSnapshot {
    pub fn account(&self, id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id.as_str() == id)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
