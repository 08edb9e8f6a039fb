use crate::error::{ExpansionError, ExpansionResult};
use bases_core::{
    AccountId, Amount, CommitmentId, CommitmentStatus, ExpansionCommitment, IdSequence,
    InstrumentId, OpportunityId, Posting, PostingReason, Rate, Tick,
};
use bases_finance::Ledger;
use bases_marketplace::Venue;
use bases_opportunities::{OpportunityGenerator, payout_at};
use bases_ports::{LedgerError, LedgerResult, MaturityOutcome, MaturityPolicy};
use log::{debug, error, info};
use parking_lot::Mutex;
use priority_queue::PriorityQueue;
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;

/// How a single commitment settled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Settlement {
    Matured { payout: Amount },
    Failed { loss: Amount },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Maturation {
    pub commitment_id: CommitmentId,
    pub account: AccountId,
    pub capital: Amount,
    pub settlement: Settlement,
    /// Instrument newly listed on the venue by this maturation
    pub unlocked: Option<InstrumentId>,
}

/// What one planner tick settled
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExpansionTick {
    pub tick: Tick,
    pub maturations: Vec<Maturation>,
    /// Commitments whose ledger settlement failed; retried next tick
    pub deferred: Vec<CommitmentId>,
}

/// Commitments by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommitmentCounts {
    pub active: usize,
    pub matured: usize,
    pub failed: usize,
    pub cancelled: usize,
}

struct PlannerState {
    commitments: BTreeMap<CommitmentId, ExpansionCommitment>,
    /// Active commitments by (maturity tick, id), earliest first
    schedule: PriorityQueue<CommitmentId, Reverse<(Tick, CommitmentId)>>,
    policy: Box<dyn MaturityPolicy>,
}

/// Commits account capital to open opportunities and settles it at
/// maturity
///
/// Committed capital stays reserved in the ledger until the commitment
/// matures, fails, or is cancelled. Each commitment leaves the active state
/// exactly once.
pub struct ExpansionPlanner {
    ledger: Arc<Ledger>,
    venue: Arc<Venue>,
    opportunities: Arc<OpportunityGenerator>,
    state: Mutex<PlannerState>,
    ids: IdSequence,
}

impl ExpansionPlanner {
    pub fn new(
        ledger: Arc<Ledger>,
        venue: Arc<Venue>,
        opportunities: Arc<OpportunityGenerator>,
        policy: Box<dyn MaturityPolicy>,
    ) -> Self {
        info!("Expansion planner using {} maturity policy", policy.name());
        Self {
            ledger,
            venue,
            opportunities,
            state: Mutex::new(PlannerState {
                commitments: BTreeMap::new(),
                schedule: PriorityQueue::new(),
                policy,
            }),
            ids: IdSequence::new(),
        }
    }

    pub fn policy_name(&self) -> String {
        self.state.lock().policy.name().to_string()
    }

    /// Commit `account` to an open opportunity, reserving its required
    /// capital
    ///
    /// Fails with `NotOpen` unless the opportunity is open at `tick`, and
    /// with `InsufficientFunds` if the capital cannot be reserved. On
    /// failure nothing changes.
    pub fn commit(
        &self,
        account: &AccountId,
        opportunity_id: OpportunityId,
        tick: Tick,
    ) -> ExpansionResult<ExpansionCommitment> {
        let mut state = self.state.lock();

        let opportunity = self
            .opportunities
            .claim(opportunity_id, account, tick, |opportunity| {
                self.ledger.reserve(account, opportunity.required_capital)
            })?;

        let commitment = ExpansionCommitment {
            id: self.ids.next(),
            opportunity_id,
            account: account.clone(),
            capital: opportunity.required_capital,
            expected_return: opportunity.expected_return,
            committed_at: tick,
            maturity_tick: tick.saturating_add(opportunity.maturity_ticks),
            status: CommitmentStatus::Active,
            settled_at: None,
            payout: None,
            loss: None,
        };

        state.schedule.push(
            commitment.id,
            Reverse((commitment.maturity_tick, commitment.id)),
        );
        state.commitments.insert(commitment.id, commitment.clone());

        info!(
            "{} locked {} of {} on {} until tick {}",
            commitment.id, commitment.capital, account, opportunity_id, commitment.maturity_tick
        );
        Ok(commitment)
    }

    /// Settle every active commitment due at or before `tick`
    ///
    /// Commitments are processed in (maturity tick, id) order. Settled
    /// commitments leave the schedule, so repeated calls are no-ops for
    /// them.
    pub fn tick(&self, tick: Tick) -> ExpansionTick {
        let mut report = ExpansionTick {
            tick,
            ..Default::default()
        };
        let mut state = self.state.lock();
        let PlannerState {
            commitments,
            schedule,
            policy,
        } = &mut *state;

        let mut retry = Vec::new();
        while let Some((_, Reverse((due, _)))) = schedule.peek() {
            if *due > tick {
                break;
            }
            let Some((id, priority)) = schedule.pop() else {
                break;
            };
            let Some(commitment) = commitments.get_mut(&id) else {
                continue;
            };
            if !commitment.is_due(tick) {
                continue;
            }

            let outcome = policy.decide(commitment, tick);
            match self.settle(commitment, outcome, tick) {
                Ok(maturation) => report.maturations.push(maturation),
                Err(err) => {
                    error!("Could not settle {}: {}; retrying next tick", id, err);
                    report.deferred.push(id);
                    retry.push((id, priority));
                }
            }
        }
        for (id, priority) in retry {
            schedule.push(id, priority);
        }

        if !report.maturations.is_empty() {
            info!("Tick {}: {} commitments settled", tick, report.maturations.len());
        }
        report
    }

    fn settle(
        &self,
        commitment: &mut ExpansionCommitment,
        outcome: MaturityOutcome,
        tick: Tick,
    ) -> LedgerResult<Maturation> {
        let id = commitment.id;
        let account = commitment.account.clone();
        let capital = commitment.capital;
        let market = AccountId::market();

        let settlement = match outcome {
            MaturityOutcome::Success => {
                let payout = payout_at(capital, commitment.expected_return)
                    .ok_or_else(|| LedgerError::Overflow(account.clone()))?;
                // Pay out while the reservation still pins the account open,
                // then consume the capital. A failed drawdown reverses the
                // payout and the commitment stays active.
                let paid = if payout.is_positive() {
                    Some(self.ledger.post(
                        &market,
                        &account,
                        payout,
                        PostingReason::Payout(id),
                    )?)
                } else {
                    None
                };
                if let Err(err) = self.ledger.post_from_reserved(
                    &account,
                    &market,
                    capital,
                    capital,
                    PostingReason::CapitalDrawdown(id),
                ) {
                    if let Some(posting) = paid {
                        self.reverse(&posting);
                    }
                    return Err(err);
                }
                commitment.status = CommitmentStatus::Matured;
                commitment.payout = Some(payout);
                Settlement::Matured { payout }
            }
            MaturityOutcome::Failure { loss_fraction } => {
                let loss = loss_for(capital, loss_fraction)
                    .ok_or_else(|| LedgerError::Overflow(account.clone()))?;
                if loss.is_positive() {
                    self.ledger.post_from_reserved(
                        &account,
                        &market,
                        capital,
                        loss,
                        PostingReason::Loss(id),
                    )?;
                } else {
                    self.ledger.release(&account, capital)?;
                }
                commitment.status = CommitmentStatus::Failed;
                commitment.loss = Some(loss);
                Settlement::Failed { loss }
            }
        };
        commitment.settled_at = Some(tick);

        let unlocked = match &settlement {
            Settlement::Matured { .. } => self.unlock(commitment.opportunity_id),
            Settlement::Failed { .. } => None,
        };

        debug!("{} settled at tick {}: {:?}", id, tick, settlement);
        Ok(Maturation {
            commitment_id: id,
            account,
            capital,
            settlement,
            unlocked,
        })
    }

    /// Undo a payout whose drawdown could not follow it
    fn reverse(&self, posting: &Posting) {
        let reason = PostingReason::Transfer(format!("reversal of {}", posting.id));
        if let Err(err) = self
            .ledger
            .post(&posting.to, &posting.from, posting.amount, reason)
        {
            error!("Could not reverse {}: {}", posting.id, err);
        }
    }

    fn unlock(&self, opportunity_id: OpportunityId) -> Option<InstrumentId> {
        let instrument = self.opportunities.get(opportunity_id)?.unlocks?;
        if self.venue.list_instrument(instrument.clone()) {
            Some(instrument)
        } else {
            None
        }
    }

    /// Release an active commitment's capital before maturity
    ///
    /// Fails with `AlreadyMatured` on a commitment that has already left the
    /// active state. The opportunity stays committed.
    pub fn cancel(&self, id: CommitmentId, tick: Tick) -> ExpansionResult<ExpansionCommitment> {
        let mut state = self.state.lock();
        let commitment = state
            .commitments
            .get_mut(&id)
            .ok_or(ExpansionError::UnknownCommitment(id))?;
        if commitment.status.is_terminal() {
            return Err(ExpansionError::AlreadyMatured(id));
        }

        self.ledger.release(&commitment.account, commitment.capital)?;
        commitment.status = CommitmentStatus::Cancelled;
        commitment.settled_at = Some(tick);
        let cancelled = commitment.clone();
        state.schedule.remove(&id);

        info!("{} cancelled, released {} to {}", id, cancelled.capital, cancelled.account);
        Ok(cancelled)
    }

    pub fn commitment(&self, id: CommitmentId) -> Option<ExpansionCommitment> {
        self.state.lock().commitments.get(&id).cloned()
    }

    pub fn commitments_for(&self, account: &AccountId) -> Vec<ExpansionCommitment> {
        self.state
            .lock()
            .commitments
            .values()
            .filter(|c| &c.account == account)
            .cloned()
            .collect()
    }

    /// Active commitments, ordered by id
    pub fn active(&self) -> Vec<ExpansionCommitment> {
        self.state
            .lock()
            .commitments
            .values()
            .filter(|c| c.status == CommitmentStatus::Active)
            .cloned()
            .collect()
    }

    /// Every commitment, ordered by id
    pub fn all(&self) -> Vec<ExpansionCommitment> {
        self.state.lock().commitments.values().cloned().collect()
    }

    /// Capital currently reserved by active commitments
    pub fn locked_capital(&self) -> Amount {
        self.active().iter().map(|c| c.capital).sum()
    }

    pub fn counts(&self) -> CommitmentCounts {
        let state = self.state.lock();
        let mut counts = CommitmentCounts::default();
        for commitment in state.commitments.values() {
            match commitment.status {
                CommitmentStatus::Active => counts.active += 1,
                CommitmentStatus::Matured => counts.matured += 1,
                CommitmentStatus::Failed => counts.failed += 1,
                CommitmentStatus::Cancelled => counts.cancelled += 1,
            }
        }
        counts
    }
}

/// capital * loss fraction, with the fraction clamped to [0, 1]
fn loss_for(capital: Amount, loss_fraction: Rate) -> Option<Amount> {
    capital.scale(loss_fraction.clamp(Decimal::ZERO, Decimal::ONE))
}
