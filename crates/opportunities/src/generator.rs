use crate::assessment::{AlertThresholds, Assessment};
use crate::error::{OpportunityError, OpportunityResult};
use bases_core::{
    AccountId, CancelReason, IdSequence, Opportunity, OpportunityId, OpportunitySpec,
    OpportunityStatus, OrderRequest, StandingIndicators, Tick,
};
use bases_finance::Ledger;
use bases_marketplace::{CancelOutcome, Venue};
use bases_ports::{GenerationContext, LedgerResult, OpportunityPolicy};
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// What one generator tick changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OpportunityTick {
    pub tick: Tick,
    pub opened: Vec<OpportunityId>,
    pub expired: Vec<OpportunityId>,
    pub generated: Vec<OpportunityId>,
}

/// Opportunities by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OpportunityCounts {
    pub pending: usize,
    pub open: usize,
    pub committed: usize,
    pub expired: usize,
}

struct GeneratorState {
    opportunities: BTreeMap<OpportunityId, Opportunity>,
    policy: Box<dyn OpportunityPolicy>,
}

/// Owns every opportunity record and drives their lifecycle
///
/// pending → open → committed | expired. Open opportunities carrying an
/// offer have it resting on the venue as a sell order from the market
/// account until they close.
pub struct OpportunityGenerator {
    ledger: Arc<Ledger>,
    venue: Arc<Venue>,
    state: Mutex<GeneratorState>,
    ids: IdSequence,
}

impl OpportunityGenerator {
    pub fn new(ledger: Arc<Ledger>, venue: Arc<Venue>, policy: Box<dyn OpportunityPolicy>) -> Self {
        info!("Opportunity generator using {} policy", policy.name());
        Self {
            ledger,
            venue,
            state: Mutex::new(GeneratorState {
                opportunities: BTreeMap::new(),
                policy,
            }),
            ids: IdSequence::new(),
        }
    }

    pub fn policy_name(&self) -> String {
        self.state.lock().policy.name().to_string()
    }

    /// Advance to `tick`: open due pending opportunities, expire closed
    /// windows, then ask the policy for new ones
    pub fn tick(&self, tick: Tick) -> OpportunityTick {
        let mut report = OpportunityTick {
            tick,
            ..Default::default()
        };
        let mut state = self.state.lock();

        for opportunity in state.opportunities.values_mut() {
            match opportunity.status {
                OpportunityStatus::Pending if opportunity.opens_at <= tick => {
                    if self.open(opportunity, tick) {
                        report.opened.push(opportunity.id);
                    } else {
                        report.expired.push(opportunity.id);
                    }
                }
                OpportunityStatus::Open if opportunity.is_expired_at(tick) => {
                    self.expire(opportunity);
                    report.expired.push(opportunity.id);
                }
                _ => {}
            }
        }

        let instruments = self.venue.instruments();
        let counts = count(&state.opportunities);
        let ctx = GenerationContext {
            tick,
            open_count: counts.open,
            pending_count: counts.pending,
            instruments: &instruments,
        };
        let specs = state.policy.generate(&ctx);

        for spec in specs {
            if let Err(reason) = validate(&spec) {
                warn!("Discarding opportunity from {}: {}", state.policy.name(), reason);
                continue;
            }

            let mut opportunity = Opportunity::from_spec(self.ids.next(), spec, tick);
            report.generated.push(opportunity.id);
            if opportunity.opens_at <= tick {
                if self.open(&mut opportunity, tick) {
                    report.opened.push(opportunity.id);
                } else {
                    report.expired.push(opportunity.id);
                }
            }
            debug!(
                "Generated {} needing {} at {} return, open {}..{}",
                opportunity.id,
                opportunity.required_capital,
                opportunity.expected_return,
                opportunity.opens_at,
                opportunity.expires_at
            );
            state.opportunities.insert(opportunity.id, opportunity);
        }

        if !report.generated.is_empty() || !report.expired.is_empty() {
            info!(
                "Tick {}: {} generated, {} opened, {} expired",
                tick,
                report.generated.len(),
                report.opened.len(),
                report.expired.len()
            );
        }
        report
    }

    /// Open a pending opportunity and publish its offer.
    /// Returns false if the window had already closed.
    fn open(&self, opportunity: &mut Opportunity, tick: Tick) -> bool {
        if opportunity.is_expired_at(tick) {
            opportunity.status = OpportunityStatus::Expired;
            return false;
        }

        opportunity.status = OpportunityStatus::Open;
        if let Some(offer) = &opportunity.offer {
            let request = OrderRequest::sell(
                AccountId::market(),
                offer.instrument.clone(),
                offer.quantity,
                offer.price,
            );
            match self.venue.submit(request) {
                Ok(order) => opportunity.offer_order = Some(order.id),
                Err(err) => warn!("Could not publish offer for {}: {}", opportunity.id, err),
            }
        }
        true
    }

    fn expire(&self, opportunity: &mut Opportunity) {
        opportunity.status = OpportunityStatus::Expired;
        self.withdraw_offer(opportunity);
        debug!("Expired {}", opportunity.id);
    }

    fn withdraw_offer(&self, opportunity: &Opportunity) {
        let Some(order_id) = opportunity.offer_order else {
            return;
        };
        match self.venue.cancel_with_reason(order_id, CancelReason::Withdrawn) {
            Ok(CancelOutcome::Cancelled { .. }) => debug!("Withdrew offer {}", order_id),
            Ok(outcome) => debug!("Offer {} already closed: {:?}", order_id, outcome),
            Err(err) => warn!("Could not withdraw offer {}: {}", order_id, err),
        }
    }

    /// Open, uncommitted opportunities at `tick`, best return first, then
    /// most urgent
    pub fn list_open(&self, tick: Tick) -> Vec<Opportunity> {
        let state = self.state.lock();
        let mut open: Vec<Opportunity> = state
            .opportunities
            .values()
            .filter(|o| o.is_open_at(tick))
            .cloned()
            .collect();
        open.sort_by(|a, b| {
            b.expected_return
                .cmp(&a.expected_return)
                .then(a.expires_at.cmp(&b.expires_at))
                .then(a.id.cmp(&b.id))
        });
        open
    }

    /// `list_open` restricted to what `account` can currently fund
    pub fn list_fundable(&self, account: &AccountId, tick: Tick) -> Vec<Opportunity> {
        let available = self.ledger.available_of(account);
        self.list_open(tick)
            .into_iter()
            .filter(|o| o.required_capital <= available)
            .collect()
    }

    /// `list_fundable` further restricted to opportunities whose
    /// eligibility admits an account with `indicators`
    pub fn list_eligible(
        &self,
        account: &AccountId,
        indicators: &StandingIndicators,
        tick: Tick,
    ) -> Vec<Opportunity> {
        self.list_fundable(account, tick)
            .into_iter()
            .filter(|o| o.eligibility.admits(indicators))
            .collect()
    }

    /// Assess every open opportunity, in `list_open` order
    pub fn assess_open(&self, tick: Tick, thresholds: &AlertThresholds) -> Vec<Assessment> {
        self.list_open(tick)
            .iter()
            .filter_map(|opportunity| {
                let assessment = Assessment::of(opportunity, thresholds);
                if assessment.is_none() {
                    warn!("Cannot project {}: payout overflows", opportunity.id);
                }
                assessment
            })
            .collect()
    }

    /// Atomically check an opportunity is open, fund it, and mark it
    /// committed to `account`
    ///
    /// `fund` runs under the generator lock with the opportunity as it
    /// stands; if it fails nothing changes.
    pub fn claim<F>(
        &self,
        id: OpportunityId,
        account: &AccountId,
        tick: Tick,
        fund: F,
    ) -> OpportunityResult<Opportunity>
    where
        F: FnOnce(&Opportunity) -> LedgerResult<()>,
    {
        let mut state = self.state.lock();
        let opportunity = state
            .opportunities
            .get_mut(&id)
            .ok_or(OpportunityError::NotFound(id))?;

        if !opportunity.is_open_at(tick) {
            let status = if opportunity.status == OpportunityStatus::Open {
                OpportunityStatus::Expired
            } else {
                opportunity.status
            };
            return Err(OpportunityError::NotOpen { id, status });
        }

        fund(opportunity)?;

        opportunity.status = OpportunityStatus::Committed;
        opportunity.committed_by = Some(account.clone());
        self.withdraw_offer(opportunity);

        info!("{} committed by {} at tick {}", id, account, tick);
        Ok(opportunity.clone())
    }

    pub fn get(&self, id: OpportunityId) -> Option<Opportunity> {
        self.state.lock().opportunities.get(&id).cloned()
    }

    /// Every opportunity ever generated, ordered by id
    pub fn all(&self) -> Vec<Opportunity> {
        self.state.lock().opportunities.values().cloned().collect()
    }

    pub fn counts(&self) -> OpportunityCounts {
        count(&self.state.lock().opportunities)
    }
}

fn count(opportunities: &BTreeMap<OpportunityId, Opportunity>) -> OpportunityCounts {
    let mut counts = OpportunityCounts::default();
    for opportunity in opportunities.values() {
        match opportunity.status {
            OpportunityStatus::Pending => counts.pending += 1,
            OpportunityStatus::Open => counts.open += 1,
            OpportunityStatus::Committed => counts.committed += 1,
            OpportunityStatus::Expired => counts.expired += 1,
        }
    }
    counts
}

fn validate(spec: &OpportunitySpec) -> Result<(), String> {
    if !spec.required_capital.is_positive() {
        return Err(format!("required capital {} is not positive", spec.required_capital));
    }
    if spec.window == 0 {
        return Err("window is empty".to_string());
    }
    if let Some(offer) = &spec.offer {
        if offer.quantity <= 0 || !offer.price.is_positive() {
            return Err(format!("offer {} x {} is not tradable", offer.quantity, offer.price));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{NoOpportunities, ScheduledOpportunities};
    use bases_core::Amount;
    use rust_decimal_macros::dec;

    fn generator(policy: Box<dyn OpportunityPolicy>) -> OpportunityGenerator {
        let ledger = Arc::new(Ledger::new());
        let venue = Arc::new(Venue::new(Arc::clone(&ledger)));
        OpportunityGenerator::new(ledger, venue, policy)
    }

    #[test]
    fn test_no_policy_generates_nothing() {
        let generator = generator(Box::new(NoOpportunities));
        let report = generator.tick(0);
        assert!(report.generated.is_empty());
        assert_eq!(generator.counts(), OpportunityCounts::default());
    }

    #[test]
    fn test_invalid_specs_are_discarded() {
        let schedule = ScheduledOpportunities::new()
            .at(0, OpportunitySpec::new(Amount::ZERO, dec!(0.1), 5, 1))
            .at(0, OpportunitySpec::new(Amount::from_minor(10), dec!(0.1), 0, 1))
            .at(0, OpportunitySpec::new(Amount::from_minor(10), dec!(0.1), 5, 1));
        let generator = generator(Box::new(schedule));

        let report = generator.tick(0);
        assert_eq!(report.generated.len(), 1);
        assert_eq!(report.opened, report.generated);
    }

    #[test]
    fn test_pending_opens_later() {
        let schedule = ScheduledOpportunities::new().at(
            1,
            OpportunitySpec::new(Amount::from_minor(10), dec!(0.1), 3, 1).opening_in(2),
        );
        let generator = generator(Box::new(schedule));

        generator.tick(0);
        let report = generator.tick(1);
        let id = report.generated[0];
        assert!(report.opened.is_empty());
        assert_eq!(generator.get(id).unwrap().status, OpportunityStatus::Pending);
        assert!(generator.list_open(2).is_empty());

        generator.tick(2);
        assert!(generator.tick(3).opened.contains(&id));
        assert_eq!(generator.list_open(3).len(), 1);

        // Window is 3..6
        assert!(generator.tick(6).expired.contains(&id));
        assert_eq!(generator.counts().expired, 1);
    }

    #[test]
    fn test_claim_runs_funding_under_lock() {
        let schedule = ScheduledOpportunities::new()
            .at(0, OpportunitySpec::new(Amount::from_minor(10), dec!(0.1), 5, 1));
        let generator = generator(Box::new(schedule));
        let id = generator.tick(0).generated[0];

        let err = generator
            .claim(id, &AccountId::from("a"), 0, |_| {
                Err(bases_ports::LedgerError::AccountClosed(AccountId::from("a")))
            })
            .unwrap_err();
        assert!(matches!(err, OpportunityError::Funding(_)));
        assert_eq!(generator.get(id).unwrap().status, OpportunityStatus::Open);

        let claimed = generator
            .claim(id, &AccountId::from("a"), 0, |_| Ok(()))
            .unwrap();
        assert_eq!(claimed.status, OpportunityStatus::Committed);
        assert_eq!(claimed.committed_by, Some(AccountId::from("a")));

        assert_eq!(
            generator.claim(id, &AccountId::from("b"), 0, |_| Ok(())),
            Err(OpportunityError::NotOpen {
                id,
                status: OpportunityStatus::Committed
            })
        );
        assert_eq!(
            generator.claim(OpportunityId(42), &AccountId::from("b"), 0, |_| Ok(())),
            Err(OpportunityError::NotFound(OpportunityId(42)))
        );
    }
}
