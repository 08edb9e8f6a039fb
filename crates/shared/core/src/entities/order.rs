use serde::{Deserialize, Serialize};

use super::{OrderStatus, Side};
use crate::values::{AccountId, Amount, InstrumentId, OrderId, Quantity, Tick};

/// Intent to trade, as submitted by an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub account: AccountId,
    pub side: Side,
    pub instrument: InstrumentId,
    pub quantity: Quantity,
    /// Limit price per unit, in minor units
    pub limit_price: Amount,
}

impl OrderRequest {
    pub fn buy(
        account: impl Into<AccountId>,
        instrument: impl Into<InstrumentId>,
        quantity: Quantity,
        limit_price: Amount,
    ) -> Self {
        Self {
            account: account.into(),
            side: Side::Buy,
            instrument: instrument.into(),
            quantity,
            limit_price,
        }
    }

    pub fn sell(
        account: impl Into<AccountId>,
        instrument: impl Into<InstrumentId>,
        quantity: Quantity,
        limit_price: Amount,
    ) -> Self {
        Self {
            account: account.into(),
            side: Side::Sell,
            instrument: instrument.into(),
            quantity,
            limit_price,
        }
    }
}

/// Order resting on (or retired from) the venue's book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub account: AccountId,
    pub side: Side,
    pub instrument: InstrumentId,
    pub quantity: Quantity,
    pub filled_quantity: Quantity,
    pub limit_price: Amount,
    /// Tick at which the venue accepted the order
    pub submitted_at: Tick,
    pub status: OrderStatus,
}

impl Order {
    /// Accept a request into an order with venue-assigned id and tick
    pub fn from_request(id: OrderId, request: OrderRequest, submitted_at: Tick) -> Self {
        Self {
            id,
            account: request.account,
            side: request.side,
            instrument: request.instrument,
            quantity: request.quantity,
            filled_quantity: 0,
            limit_price: request.limit_price,
            submitted_at,
            status: OrderStatus::Submitted,
        }
    }

    /// Returns remaining quantity to be filled
    pub fn remaining_quantity(&self) -> Quantity {
        self.quantity - self.filled_quantity
    }

    /// Returns true if the order is completely filled
    pub fn is_filled(&self) -> bool {
        self.filled_quantity >= self.quantity
    }

    /// Funds the venue holds in reservation for the unfilled remainder.
    /// Only buy orders reserve; sells are unconstrained inventory.
    pub fn reserved_remaining(&self) -> Amount {
        if !self.side.reserves_funds() {
            return Amount::ZERO;
        }
        self.limit_price
            .checked_mul_qty(self.remaining_quantity())
            .unwrap_or(Amount::ZERO)
    }

    /// True if this order arrived before `other` (time priority)
    pub fn precedes(&self, other: &Order) -> bool {
        (self.submitted_at, self.id) < (other.submitted_at, other.id)
    }

    /// Record a fill and advance the status
    pub fn apply_fill(&mut self, quantity: Quantity) {
        self.filled_quantity += quantity;
        self.status = if self.is_filled() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
    }
}
