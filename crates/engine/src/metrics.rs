use bases_core::Amount;
use bases_expansion::Settlement;
use serde::{Deserialize, Serialize};

use crate::engine::StepReport;

/// Cumulative counters over a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationMetrics {
    pub ticks: u64,
    pub trades: u64,
    pub traded_volume: i64,
    pub traded_notional: Amount,
    pub postings: u64,
    pub opportunities_generated: u64,
    pub opportunities_opened: u64,
    pub opportunities_expired: u64,
    pub opportunities_committed: u64,
    pub commitments_matured: u64,
    pub commitments_failed: u64,
    pub total_payout: Amount,
    pub total_loss: Amount,
    pub instruments_unlocked: u64,
    pub settlement_failures: u64,
}

impl SimulationMetrics {
    /// Fold one step into the totals. `postings` and `committed` are
    /// gauges read after the step.
    pub fn record(&mut self, report: &StepReport, postings: usize, committed: usize) {
        self.ticks += 1;
        self.postings = postings as u64;
        self.opportunities_committed = committed as u64;

        self.trades += report.matching.trades.len() as u64;
        self.traded_volume += report.matching.volume();
        self.traded_notional += report.matching.notional();
        self.settlement_failures += report.matching.settlement_failures.len() as u64;

        self.opportunities_generated += report.opportunities.generated.len() as u64;
        self.opportunities_opened += report.opportunities.opened.len() as u64;
        self.opportunities_expired += report.opportunities.expired.len() as u64;

        for maturation in &report.maturations.maturations {
            match maturation.settlement {
                Settlement::Matured { payout } => {
                    self.commitments_matured += 1;
                    self.total_payout += payout;
                }
                Settlement::Failed { loss } => {
                    self.commitments_failed += 1;
                    self.total_loss += loss;
                }
            }
            if maturation.unlocked.is_some() {
                self.instruments_unlocked += 1;
            }
        }
    }
}
