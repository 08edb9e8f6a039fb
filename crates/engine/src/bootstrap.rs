//! Bootstrap - build a ready-to-start engine from configuration
//!
//! - Validates the settings
//! - Creates the ledger, venue, opportunity generator and expansion planner
//! - Lists the configured instruments
//! - Seeds every initial account from the market account

use bases_expansion::ExpansionPlanner;
use bases_finance::Ledger;
use bases_marketplace::Venue;
use bases_matching::create_matching_algorithm;
use bases_opportunities::OpportunityGenerator;
use log::info;
use std::sync::Arc;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::engine::SimulationEngine;
use crate::error::EngineResult;

/// Build an idle engine. Nothing is partially constructed on error.
pub fn bootstrap(config: EngineConfig) -> EngineResult<SimulationEngine> {
    config.settings.validate()?;
    let (settings, opportunity_policy, maturity_policy) = config.into_parts();

    let matcher = create_matching_algorithm(&settings.matching_algorithm)?;

    let ledger = Arc::new(Ledger::new());
    ledger.set_tick(settings.start_tick);

    let venue = Arc::new(Venue::with_matcher(Arc::clone(&ledger), matcher));
    venue.set_tick(settings.start_tick);
    for instrument in &settings.instruments {
        venue.list_instrument(instrument.clone());
    }

    let opportunities = Arc::new(OpportunityGenerator::new(
        Arc::clone(&ledger),
        Arc::clone(&venue),
        opportunity_policy,
    ));
    let expansion = Arc::new(ExpansionPlanner::new(
        Arc::clone(&ledger),
        Arc::clone(&venue),
        Arc::clone(&opportunities),
        maturity_policy,
    ));

    for account in &settings.initial_accounts {
        ledger.deposit(&account.id, account.balance)?;
        info!("Seeded {} with {}", account.id, account.balance);
    }

    info!(
        "Bootstrapped {} instruments and {} accounts at tick {}",
        settings.instruments.len(),
        settings.initial_accounts.len(),
        settings.start_tick
    );

    Ok(SimulationEngine::new(
        settings.start_tick,
        Duration::from_millis(settings.tick_interval_ms),
        ledger,
        venue,
        opportunities,
        expansion,
    ))
}
