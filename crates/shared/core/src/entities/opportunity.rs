use serde::{Deserialize, Serialize};

use super::Eligibility;
use crate::values::{AccountId, Amount, InstrumentId, OpportunityId, OrderId, Quantity, Rate, Tick};

/// Opportunity lifecycle: pending → open → committed | expired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpportunityStatus {
    /// Announced, not yet investable
    Pending,
    /// Investable until its expiry tick
    Open,
    /// Capital committed by an account
    Committed,
    /// Window closed without commitment
    Expired,
}

impl OpportunityStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OpportunityStatus::Committed | OpportunityStatus::Expired
        )
    }
}

/// A tradable offer published to the venue while an opportunity is open
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub instrument: InstrumentId,
    pub quantity: Quantity,
    pub price: Amount,
}

/// Parameters for a new opportunity, as produced by a generation policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunitySpec {
    pub required_capital: Amount,
    pub expected_return: Rate,
    /// Ticks between generation and opening (0 = opens immediately)
    pub opens_in: Tick,
    /// Ticks the opportunity stays open
    pub window: Tick,
    /// Ticks between commitment and maturity
    pub maturity_ticks: Tick,
    /// Instrument listed on the venue when a commitment on it succeeds
    pub unlocks: Option<InstrumentId>,
    pub offer: Option<Offer>,
    /// Standing-gated listings hide the opportunity below this
    #[serde(default)]
    pub eligibility: Eligibility,
}

impl OpportunitySpec {
    /// Minimal spec: opens immediately, no unlock, no offer
    pub fn new(
        required_capital: Amount,
        expected_return: Rate,
        window: Tick,
        maturity_ticks: Tick,
    ) -> Self {
        Self {
            required_capital,
            expected_return,
            opens_in: 0,
            window,
            maturity_ticks,
            unlocks: None,
            offer: None,
            eligibility: Eligibility::default(),
        }
    }

    pub fn opening_in(mut self, ticks: Tick) -> Self {
        self.opens_in = ticks;
        self
    }

    pub fn unlocking(mut self, instrument: impl Into<InstrumentId>) -> Self {
        self.unlocks = Some(instrument.into());
        self
    }

    pub fn with_offer(mut self, offer: Offer) -> Self {
        self.offer = Some(offer);
        self
    }

    pub fn requiring(mut self, eligibility: Eligibility) -> Self {
        self.eligibility = eligibility;
        self
    }
}

/// Time-boxed, capital-requiring investable event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: OpportunityId,
    pub required_capital: Amount,
    pub expected_return: Rate,
    pub opens_at: Tick,
    pub expires_at: Tick,
    pub maturity_ticks: Tick,
    pub status: OpportunityStatus,
    pub unlocks: Option<InstrumentId>,
    pub offer: Option<Offer>,
    #[serde(default)]
    pub eligibility: Eligibility,
    /// Venue order carrying the offer while open
    pub offer_order: Option<OrderId>,
    pub committed_by: Option<AccountId>,
    pub created_at: Tick,
}

impl Opportunity {
    /// Materialize a spec generated at `tick`
    pub fn from_spec(id: OpportunityId, spec: OpportunitySpec, tick: Tick) -> Self {
        let opens_at = tick.saturating_add(spec.opens_in);
        Self {
            id,
            required_capital: spec.required_capital,
            expected_return: spec.expected_return,
            opens_at,
            expires_at: opens_at.saturating_add(spec.window),
            maturity_ticks: spec.maturity_ticks,
            status: OpportunityStatus::Pending,
            unlocks: spec.unlocks,
            offer: spec.offer,
            eligibility: spec.eligibility,
            offer_order: None,
            committed_by: None,
            created_at: tick,
        }
    }

    /// Whether the window has closed at `tick`
    pub fn is_expired_at(&self, tick: Tick) -> bool {
        tick >= self.expires_at
    }

    /// Open and still inside its window at `tick`
    pub fn is_open_at(&self, tick: Tick) -> bool {
        self.status == OpportunityStatus::Open && !self.is_expired_at(tick)
    }
}
