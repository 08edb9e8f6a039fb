//! Built-in generation policies

use bases_core::{Amount, InstrumentId, Offer, OpportunitySpec, Tick};
use bases_ports::{GenerationContext, OpportunityPolicy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Never generates anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpportunities;

impl OpportunityPolicy for NoOpportunities {
    fn generate(&mut self, _ctx: &GenerationContext<'_>) -> Vec<OpportunitySpec> {
        Vec::new()
    }

    fn name(&self) -> &str {
        "None"
    }
}

/// Emits a fixed list of opportunities at given ticks
#[derive(Debug, Default, Clone)]
pub struct ScheduledOpportunities {
    schedule: BTreeMap<Tick, Vec<OpportunitySpec>>,
}

impl ScheduledOpportunities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Announce `spec` at `tick`
    pub fn at(mut self, tick: Tick, spec: OpportunitySpec) -> Self {
        self.schedule.entry(tick).or_default().push(spec);
        self
    }

    /// Specs still waiting to be announced
    pub fn remaining(&self) -> usize {
        self.schedule.values().map(Vec::len).sum()
    }
}

impl OpportunityPolicy for ScheduledOpportunities {
    fn generate(&mut self, ctx: &GenerationContext<'_>) -> Vec<OpportunitySpec> {
        self.schedule.remove(&ctx.tick).unwrap_or_default()
    }

    fn name(&self) -> &str {
        "Scheduled"
    }
}

/// Ranges for randomly generated opportunities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomOpportunitiesConfig {
    /// Chance of announcing one opportunity per tick (0.0 to 1.0)
    pub probability: f64,
    /// No new opportunities while this many are open or pending
    pub max_live: usize,
    /// Required capital range, minor units
    pub min_capital: i64,
    pub max_capital: i64,
    /// Expected return range
    pub min_return: Decimal,
    pub max_return: Decimal,
    /// Delay before opening
    pub max_opens_in: Tick,
    /// Window length range
    pub min_window: Tick,
    pub max_window: Tick,
    /// Maturity horizon range
    pub min_maturity: Tick,
    pub max_maturity: Tick,
    /// Chance an opportunity unlocks a new instrument on success
    pub unlock_probability: f64,
    /// Chance an opportunity carries an offer on a listed instrument
    pub offer_probability: f64,
    /// Offer size and unit price ranges
    pub max_offer_quantity: i64,
    pub min_offer_price: i64,
    pub max_offer_price: i64,
}

impl Default for RandomOpportunitiesConfig {
    fn default() -> Self {
        Self {
            probability: 0.3,
            max_live: 5,
            min_capital: 100,
            max_capital: 1_000,
            min_return: dec!(0.02),
            max_return: dec!(0.25),
            max_opens_in: 2,
            min_window: 3,
            max_window: 10,
            min_maturity: 2,
            max_maturity: 12,
            unlock_probability: 0.1,
            offer_probability: 0.2,
            max_offer_quantity: 10,
            min_offer_price: 10,
            max_offer_price: 100,
        }
    }
}

/// Seeded random generator; identical seeds give identical sequences
pub struct RandomOpportunities {
    config: RandomOpportunitiesConfig,
    rng: StdRng,
    unlocked: u64,
}

impl RandomOpportunities {
    pub fn with_seed(config: RandomOpportunitiesConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            unlocked: 0,
        }
    }

    fn chance(&mut self, probability: f64) -> bool {
        self.rng.gen_bool(probability.clamp(0.0, 1.0))
    }

    fn between_i64(&mut self, a: i64, b: i64) -> i64 {
        self.rng.gen_range(a.min(b)..=a.max(b))
    }

    fn between_ticks(&mut self, a: Tick, b: Tick) -> Tick {
        self.rng.gen_range(a.min(b)..=a.max(b))
    }

    /// Uniform in [min, max] at basis-point resolution
    fn between_rates(&mut self, a: Decimal, b: Decimal) -> Decimal {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let step = Decimal::from(self.rng.gen_range(0..=10_000u32)) / dec!(10000);
        (lo + (hi - lo) * step).round_dp(4)
    }

    fn spec(&mut self, ctx: &GenerationContext<'_>) -> OpportunitySpec {
        let capital = self.between_i64(self.config.min_capital.max(1), self.config.max_capital.max(1));
        let expected_return = self.between_rates(self.config.min_return, self.config.max_return);
        let window = self.between_ticks(self.config.min_window.max(1), self.config.max_window.max(1));
        let maturity = self.between_ticks(self.config.min_maturity, self.config.max_maturity);
        let opens_in = self.between_ticks(0, self.config.max_opens_in);

        let mut spec = OpportunitySpec::new(Amount::from_minor(capital), expected_return, window, maturity)
            .opening_in(opens_in);

        if self.chance(self.config.unlock_probability) {
            self.unlocked += 1;
            spec = spec.unlocking(InstrumentId::new(format!("VENUE-{}", self.unlocked)));
        }

        if !ctx.instruments.is_empty() && self.chance(self.config.offer_probability) {
            let instrument = ctx.instruments[self.rng.gen_range(0..ctx.instruments.len())].clone();
            let quantity = self.between_i64(1, self.config.max_offer_quantity.max(1));
            let price = self.between_i64(
                self.config.min_offer_price.max(1),
                self.config.max_offer_price.max(1),
            );
            spec = spec.with_offer(Offer {
                instrument,
                quantity,
                price: Amount::from_minor(price),
            });
        }

        spec
    }
}

impl OpportunityPolicy for RandomOpportunities {
    fn generate(&mut self, ctx: &GenerationContext<'_>) -> Vec<OpportunitySpec> {
        if ctx.open_count + ctx.pending_count >= self.config.max_live {
            return Vec::new();
        }
        if !self.chance(self.config.probability) {
            return Vec::new();
        }
        vec![self.spec(ctx)]
    }

    fn name(&self) -> &str {
        "Random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(tick: Tick, instruments: &[InstrumentId]) -> GenerationContext<'_> {
        GenerationContext {
            tick,
            open_count: 0,
            pending_count: 0,
            instruments,
        }
    }

    #[test]
    fn test_schedule_fires_once() {
        let mut policy = ScheduledOpportunities::new()
            .at(2, OpportunitySpec::new(Amount::from_minor(5), dec!(0.1), 1, 1))
            .at(2, OpportunitySpec::new(Amount::from_minor(6), dec!(0.1), 1, 1));
        assert_eq!(policy.remaining(), 2);

        assert!(policy.generate(&ctx(1, &[])).is_empty());
        assert_eq!(policy.generate(&ctx(2, &[])).len(), 2);
        assert!(policy.generate(&ctx(2, &[])).is_empty());
    }

    #[test]
    fn test_random_is_reproducible() {
        let instruments = vec![InstrumentId::new("WIDGET")];
        let config = RandomOpportunitiesConfig {
            probability: 1.0,
            offer_probability: 0.5,
            ..Default::default()
        };
        let mut a = RandomOpportunities::with_seed(config.clone(), 7);
        let mut b = RandomOpportunities::with_seed(config, 7);

        for tick in 0..20 {
            assert_eq!(
                a.generate(&ctx(tick, &instruments)),
                b.generate(&ctx(tick, &instruments))
            );
        }
    }

    #[test]
    fn test_random_respects_ranges() {
        let config = RandomOpportunitiesConfig {
            probability: 1.0,
            ..Default::default()
        };
        let mut policy = RandomOpportunities::with_seed(config.clone(), 42);

        for tick in 0..50 {
            let spec = policy.generate(&ctx(tick, &[])).remove(0);
            assert!(spec.required_capital >= Amount::from_minor(config.min_capital));
            assert!(spec.required_capital <= Amount::from_minor(config.max_capital));
            assert!(spec.expected_return >= config.min_return);
            assert!(spec.expected_return <= config.max_return);
            assert!(spec.window >= config.min_window && spec.window <= config.max_window);
            assert!(spec.offer.is_none(), "no instruments listed");
        }
    }

    #[test]
    fn test_random_backs_off_when_busy() {
        let config = RandomOpportunitiesConfig {
            probability: 1.0,
            max_live: 2,
            ..Default::default()
        };
        let mut policy = RandomOpportunities::with_seed(config, 1);
        let busy = GenerationContext {
            tick: 0,
            open_count: 1,
            pending_count: 1,
            instruments: &[],
        };
        assert!(policy.generate(&busy).is_empty());
    }
}
