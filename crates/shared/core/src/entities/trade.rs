use serde::{Deserialize, Serialize};

use crate::values::{AccountId, Amount, InstrumentId, OrderId, Quantity, Tick, TradeId};

/// Trade resulting from matching a buy and a sell order. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub instrument: InstrumentId,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub buyer: AccountId,
    pub seller: AccountId,
    pub quantity: Quantity,
    /// Clearing price per unit
    pub price: Amount,
    pub tick: Tick,
}

impl Trade {
    /// Returns the notional value of the trade (price * quantity)
    pub fn notional(&self) -> Option<Amount> {
        self.price.checked_mul_qty(self.quantity)
    }
}
