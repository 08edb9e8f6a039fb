use bases_core::{AccountId, Amount, InstrumentId, OrderId, Quantity, Tick, Trade};
use serde::Serialize;

/// Result of a cancel request. Only `Cancelled` changed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CancelOutcome {
    /// Removed from the book; `released` went back to the account
    Cancelled { released: Amount },
    AlreadyFilled,
    AlreadyCancelled,
    /// The venue never issued this id
    Unknown,
}

impl CancelOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CancelOutcome::Cancelled { .. })
    }
}

/// A matched pair whose trade could not be settled
///
/// Both orders were cancelled and the instrument halted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementFailure {
    pub instrument: InstrumentId,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub buyer: AccountId,
    pub seller: AccountId,
    pub quantity: Quantity,
    pub price: Amount,
    pub tick: Tick,
    pub reason: String,
}

/// Everything one matching pass produced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchReport {
    pub tick: Tick,
    pub trades: Vec<Trade>,
    pub settlement_failures: Vec<SettlementFailure>,
}

impl MatchReport {
    pub fn new(tick: Tick) -> Self {
        Self {
            tick,
            ..Default::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.settlement_failures.is_empty()
    }

    /// Units traded across all instruments
    pub fn volume(&self) -> Quantity {
        self.trades.iter().map(|t| t.quantity).sum()
    }

    /// Funds moved by settlement
    pub fn notional(&self) -> Amount {
        self.trades.iter().filter_map(Trade::notional).sum()
    }
}
