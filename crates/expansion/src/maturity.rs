//! Built-in maturity outcome rules

use bases_core::{ExpansionCommitment, Rate, Tick};
use bases_ports::{MaturityOutcome, MaturityPolicy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Every commitment pays out
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysSucceed;

impl MaturityPolicy for AlwaysSucceed {
    fn decide(&mut self, _commitment: &ExpansionCommitment, _tick: Tick) -> MaturityOutcome {
        MaturityOutcome::Success
    }

    fn name(&self) -> &str {
        "Always Succeed"
    }
}

/// Every commitment fails, losing `loss_fraction` of its capital
#[derive(Debug, Clone, Copy)]
pub struct AlwaysFail {
    pub loss_fraction: Rate,
}

impl AlwaysFail {
    pub fn new(loss_fraction: Rate) -> Self {
        Self { loss_fraction }
    }
}

impl MaturityPolicy for AlwaysFail {
    fn decide(&mut self, _commitment: &ExpansionCommitment, _tick: Tick) -> MaturityOutcome {
        MaturityOutcome::Failure {
            loss_fraction: self.loss_fraction,
        }
    }

    fn name(&self) -> &str {
        "Always Fail"
    }
}

/// Succeeds with a fixed probability, drawn from a seeded generator
///
/// Commitments are decided in (maturity tick, id) order, so a given seed
/// always yields the same outcomes for the same run.
pub struct ProbabilisticMaturity {
    success_probability: f64,
    loss_fraction: Rate,
    rng: StdRng,
}

impl ProbabilisticMaturity {
    pub fn new(success_probability: f64, loss_fraction: Rate, seed: u64) -> Self {
        Self {
            success_probability: success_probability.clamp(0.0, 1.0),
            loss_fraction,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn success_probability(&self) -> f64 {
        self.success_probability
    }
}

impl MaturityPolicy for ProbabilisticMaturity {
    fn decide(&mut self, _commitment: &ExpansionCommitment, _tick: Tick) -> MaturityOutcome {
        if self.rng.gen_bool(self.success_probability) {
            MaturityOutcome::Success
        } else {
            MaturityOutcome::Failure {
                loss_fraction: self.loss_fraction,
            }
        }
    }

    fn name(&self) -> &str {
        "Probabilistic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bases_core::{AccountId, Amount, CommitmentId, CommitmentStatus, OpportunityId};
    use rust_decimal_macros::dec;

    fn commitment() -> ExpansionCommitment {
        ExpansionCommitment {
            id: CommitmentId(1),
            opportunity_id: OpportunityId(1),
            account: AccountId::from("a"),
            capital: Amount::from_minor(100),
            expected_return: dec!(0.1),
            committed_at: 0,
            maturity_tick: 1,
            status: CommitmentStatus::Active,
            settled_at: None,
            payout: None,
            loss: None,
        }
    }

    #[test]
    fn test_extremes_are_deterministic() {
        let mut always = ProbabilisticMaturity::new(1.0, dec!(0.5), 3);
        let mut never = ProbabilisticMaturity::new(0.0, dec!(0.5), 3);
        for tick in 0..10 {
            assert_eq!(always.decide(&commitment(), tick), MaturityOutcome::Success);
            assert_eq!(
                never.decide(&commitment(), tick),
                MaturityOutcome::Failure {
                    loss_fraction: dec!(0.5)
                }
            );
        }
    }

    #[test]
    fn test_same_seed_same_outcomes() {
        let mut a = ProbabilisticMaturity::new(0.5, dec!(0.3), 11);
        let mut b = ProbabilisticMaturity::new(0.5, dec!(0.3), 11);
        let left: Vec<_> = (0..32).map(|t| a.decide(&commitment(), t)).collect();
        let right: Vec<_> = (0..32).map(|t| b.decide(&commitment(), t)).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn test_probability_is_clamped() {
        assert_eq!(ProbabilisticMaturity::new(3.0, dec!(0), 0).success_probability(), 1.0);
    }
}
