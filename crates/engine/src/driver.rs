use log::info;
use serde::Serialize;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};

use crate::engine::{EngineState, SimulationEngine};
use crate::error::{EngineError, EngineResult};
use crate::metrics::SimulationMetrics;

/// How a driven run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriveSummary {
    pub ticks_run: u64,
    pub final_tick: u64,
    pub state: EngineState,
    pub halted: bool,
    pub settlement_failures: u64,
    pub metrics: SimulationMetrics,
}

/// Step the engine on its tick interval until it halts or `max_ticks`
/// steps have run
///
/// An idle engine is started first. The interval paces wall-clock time
/// only; results are identical to calling `step` in a loop.
pub async fn drive(
    engine: &mut SimulationEngine,
    max_ticks: Option<u64>,
) -> EngineResult<DriveSummary> {
    if engine.state() == EngineState::Idle {
        engine.start()?;
    }

    let period = engine.tick_interval().max(Duration::from_millis(1));
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let halt = engine.halt_handle();
    let mut ticks_run = 0u64;
    let mut settlement_failures = 0u64;

    while max_ticks.is_none_or(|max| ticks_run < max) {
        ticker.tick().await;
        if halt.is_requested() || engine.state() != EngineState::Ticking {
            engine.halt();
            break;
        }
        let report = match engine.step() {
            Ok(report) => report,
            // Halt requested after the check above
            Err(EngineError::NotTicking(EngineState::Halted)) => break,
            Err(e) => return Err(e),
        };
        ticks_run += 1;
        settlement_failures += report.matching.settlement_failures.len() as u64;
    }

    info!(
        "Drove {} ticks, engine now at tick {} ({:?})",
        ticks_run,
        engine.current_tick(),
        engine.state()
    );

    Ok(DriveSummary {
        ticks_run,
        final_tick: engine.current_tick(),
        state: engine.state(),
        halted: engine.state() == EngineState::Halted,
        settlement_failures,
        metrics: engine.metrics().clone(),
    })
}
