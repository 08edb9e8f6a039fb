use bases_core::{AccountId, ExpansionCommitment, OpportunityId, Order, OrderRequest, Tick};
use bases_expansion::{ExpansionPlanner, ExpansionTick};
use bases_finance::Ledger;
use bases_marketplace::{MatchReport, Venue};
use bases_opportunities::{OpportunityGenerator, OpportunityTick};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::metrics::SimulationMetrics;
use crate::snapshot::SimulationSnapshot;

/// Engine lifecycle: Idle → Ticking → Halted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Idle,
    Ticking,
    /// Terminal
    Halted,
}

/// Cooperative halt request, shareable across threads
///
/// The engine checks it at the start of every step, so a request never
/// interrupts a tick in progress.
#[derive(Debug, Clone, Default)]
pub struct HaltHandle(Arc<AtomicBool>);

impl HaltHandle {
    pub fn halt(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything one tick produced, in execution order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub tick: Tick,
    pub opportunities: OpportunityTick,
    pub matching: MatchReport,
    pub maturations: ExpansionTick,
}

impl StepReport {
    /// No trade settlement failed during this tick
    pub fn is_clean(&self) -> bool {
        self.matching.is_clean()
    }

    /// Nothing happened in any subsystem
    pub fn is_quiet(&self) -> bool {
        self.opportunities.opened.is_empty()
            && self.opportunities.expired.is_empty()
            && self.opportunities.generated.is_empty()
            && self.matching.trades.is_empty()
            && self.matching.settlement_failures.is_empty()
            && self.maturations.maturations.is_empty()
            && self.maturations.deferred.is_empty()
    }
}

/// Tick scheduler over the four subsystems
///
/// Each step runs, in this order and to completion:
/// opportunities → venue matching → expansion maturation. Between steps
/// callers may submit orders and commitments; those are stamped with the
/// tick the next step will execute.
pub struct SimulationEngine {
    run_id: Uuid,
    state: EngineState,
    tick: Tick,
    tick_interval: Duration,
    ledger: Arc<Ledger>,
    venue: Arc<Venue>,
    opportunities: Arc<OpportunityGenerator>,
    expansion: Arc<ExpansionPlanner>,
    halt_flag: HaltHandle,
    metrics: SimulationMetrics,
    started_at: Option<DateTime<Utc>>,
    halted_at: Option<DateTime<Utc>>,
}

impl SimulationEngine {
    /// Wire an engine over already-built subsystems
    ///
    /// All four must share the same ledger. `tick_interval` only paces the
    /// async driver.
    pub fn new(
        start_tick: Tick,
        tick_interval: Duration,
        ledger: Arc<Ledger>,
        venue: Arc<Venue>,
        opportunities: Arc<OpportunityGenerator>,
        expansion: Arc<ExpansionPlanner>,
    ) -> Self {
        let engine = Self {
            run_id: Uuid::new_v4(),
            state: EngineState::Idle,
            tick: start_tick,
            tick_interval,
            ledger,
            venue,
            opportunities,
            expansion,
            halt_flag: HaltHandle::default(),
            metrics: SimulationMetrics::default(),
            started_at: None,
            halted_at: None,
        };
        engine.sync_tick();
        engine
    }

    fn sync_tick(&self) {
        self.ledger.set_tick(self.tick);
        self.venue.set_tick(self.tick);
    }

    pub fn start(&mut self) -> EngineResult<()> {
        if self.state != EngineState::Idle {
            return Err(EngineError::NotIdle(self.state));
        }
        self.state = EngineState::Ticking;
        self.started_at = Some(Utc::now());
        self.sync_tick();
        info!(
            "Simulation {} started at tick {} ({} matching, {} opportunities, {} maturity)",
            self.run_id,
            self.tick,
            self.venue.matcher_name(),
            self.opportunities.policy_name(),
            self.expansion.policy_name()
        );
        Ok(())
    }

    /// Execute one tick
    ///
    /// A pending halt request is honored here, before any work, and the
    /// call then fails with `NotTicking`.
    pub fn step(&mut self) -> EngineResult<StepReport> {
        if self.state == EngineState::Ticking && self.halt_flag.is_requested() {
            self.halt();
        }
        if self.state != EngineState::Ticking {
            return Err(EngineError::NotTicking(self.state));
        }

        let tick = self.tick;
        debug!("Tick {} begin", tick);

        let opportunities = self.opportunities.tick(tick);
        let matching = self.venue.match_tick();
        let maturations = self.expansion.tick(tick);

        for failure in &matching.settlement_failures {
            error!(
                "Tick {}: settlement failed on {} ({} / {}): {}",
                tick,
                failure.instrument,
                failure.buy_order_id,
                failure.sell_order_id,
                failure.reason
            );
        }
        if !maturations.deferred.is_empty() {
            warn!(
                "Tick {}: {} maturations deferred",
                tick,
                maturations.deferred.len()
            );
        }

        let report = StepReport {
            tick,
            opportunities,
            matching,
            maturations,
        };
        self.metrics.record(
            &report,
            self.ledger.posting_count(),
            self.opportunities.counts().committed,
        );

        self.tick = tick.saturating_add(1);
        self.sync_tick();
        debug!(
            "Tick {} end: {} trades, {} maturations",
            tick,
            report.matching.trades.len(),
            report.maturations.maturations.len()
        );
        Ok(report)
    }

    /// Step up to `ticks` times, stopping early if halted
    ///
    /// A halt pending before the first step yields no reports. An idle
    /// engine is an error.
    pub fn run(&mut self, ticks: u64) -> EngineResult<Vec<StepReport>> {
        let mut reports = Vec::new();
        for _ in 0..ticks {
            match self.step() {
                Ok(report) => reports.push(report),
                Err(EngineError::NotTicking(EngineState::Halted)) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(reports)
    }

    /// Move to `Halted`. Repeated calls are no-ops.
    pub fn halt(&mut self) {
        if self.state == EngineState::Halted {
            return;
        }
        self.state = EngineState::Halted;
        self.halted_at = Some(Utc::now());
        self.halt_flag.halt();
        info!(
            "Simulation {} halted at tick {}: {} ticks, {} trades, {} postings, {} matured, {} failed",
            self.run_id,
            self.tick,
            self.metrics.ticks,
            self.metrics.trades,
            self.metrics.postings,
            self.metrics.commitments_matured,
            self.metrics.commitments_failed
        );
    }

    /// Submit an order to the venue at the current tick
    pub fn submit_order(&self, request: OrderRequest) -> EngineResult<Order> {
        self.ensure_not_halted()?;
        Ok(self.venue.submit(request)?)
    }

    /// Commit an account to an open opportunity at the current tick
    pub fn commit(
        &self,
        account: &AccountId,
        opportunity: OpportunityId,
    ) -> EngineResult<ExpansionCommitment> {
        self.ensure_not_halted()?;
        Ok(self.expansion.commit(account, opportunity, self.tick)?)
    }

    fn ensure_not_halted(&self) -> EngineResult<()> {
        if self.state == EngineState::Halted {
            return Err(EngineError::NotTicking(self.state));
        }
        Ok(())
    }

    /// Serializable view of the whole simulation between ticks
    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            run_id: self.run_id,
            tick: self.tick,
            state: self.state,
            started_at: self.started_at,
            halted_at: self.halted_at,
            accounts: self.ledger.accounts(),
            open_orders: self.venue.open_orders(),
            opportunities: self.opportunities.all(),
            commitments: self.expansion.all(),
            halted_instruments: self.venue.halted_instruments(),
            metrics: self.metrics.clone(),
        }
    }

    pub fn halt_handle(&self) -> HaltHandle {
        self.halt_flag.clone()
    }

    /// Tick the next step will execute
    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn metrics(&self) -> &SimulationMetrics {
        &self.metrics
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn halted_at(&self) -> Option<DateTime<Utc>> {
        self.halted_at
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn venue(&self) -> &Arc<Venue> {
        &self.venue
    }

    pub fn opportunities(&self) -> &Arc<OpportunityGenerator> {
        &self.opportunities
    }

    pub fn expansion(&self) -> &Arc<ExpansionPlanner> {
        &self.expansion
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bases_expansion::AlwaysSucceed;
    use bases_opportunities::NoOpportunities;

    fn engine(start_tick: Tick) -> SimulationEngine {
        let _ = env_logger::builder().is_test(true).try_init();
        let ledger = Arc::new(Ledger::new());
        let venue = Arc::new(Venue::new(Arc::clone(&ledger)));
        let opportunities = Arc::new(OpportunityGenerator::new(
            Arc::clone(&ledger),
            Arc::clone(&venue),
            Box::new(NoOpportunities),
        ));
        let expansion = Arc::new(ExpansionPlanner::new(
            Arc::clone(&ledger),
            Arc::clone(&venue),
            Arc::clone(&opportunities),
            Box::new(AlwaysSucceed),
        ));
        SimulationEngine::new(
            start_tick,
            Duration::from_millis(10),
            ledger,
            venue,
            opportunities,
            expansion,
        )
    }

    #[test]
    fn test_state_machine() {
        let mut engine = engine(0);
        assert_eq!(engine.state(), EngineState::Idle);
        assert!(matches!(
            engine.step(),
            Err(EngineError::NotTicking(EngineState::Idle))
        ));

        engine.start().unwrap();
        assert!(matches!(
            engine.start(),
            Err(EngineError::NotIdle(EngineState::Ticking))
        ));

        let report = engine.step().unwrap();
        assert_eq!(report.tick, 0);
        assert!(report.is_quiet());
        assert_eq!(engine.current_tick(), 1);

        engine.halt();
        engine.halt();
        assert_eq!(engine.state(), EngineState::Halted);
        assert!(engine.halted_at().is_some());
        assert!(matches!(
            engine.step(),
            Err(EngineError::NotTicking(EngineState::Halted))
        ));
        assert!(matches!(engine.start(), Err(EngineError::NotIdle(_))));
    }

    #[test]
    fn test_tick_is_shared_with_ledger_and_venue() {
        let mut engine = engine(5);
        assert_eq!(engine.ledger().current_tick(), 5);
        engine.start().unwrap();
        engine.run(3).unwrap();
        assert_eq!(engine.current_tick(), 8);
        assert_eq!(engine.ledger().current_tick(), 8);
        assert_eq!(engine.venue().current_tick(), 8);
        assert_eq!(engine.metrics().ticks, 3);
    }

    #[test]
    fn test_halt_handle_stops_at_next_boundary() {
        let mut engine = engine(0);
        engine.start().unwrap();
        let handle = engine.halt_handle();

        engine.step().unwrap();
        handle.halt();
        assert_eq!(engine.state(), EngineState::Ticking);

        assert!(matches!(
            engine.step(),
            Err(EngineError::NotTicking(EngineState::Halted))
        ));
        assert_eq!(engine.current_tick(), 1);
    }

    #[test]
    fn test_run_stops_early_when_halted() {
        let mut engine = engine(0);
        engine.start().unwrap();
        engine.step().unwrap();
        engine.halt_handle().halt();

        let reports = engine.run(5).unwrap();
        assert!(reports.is_empty());
        assert_eq!(engine.state(), EngineState::Halted);
        assert_eq!(engine.current_tick(), 1);
        assert_eq!(engine.metrics().ticks, 1);
    }

    #[test]
    fn test_run_on_idle_engine_is_an_error() {
        let mut engine = engine(0);
        assert!(matches!(
            engine.run(3),
            Err(EngineError::NotTicking(EngineState::Idle))
        ));
    }
}
