use bases_core::{Amount, Order, Quantity};

use crate::error::MatchingResult;

/// Quantity and clearing price agreed between a buy and a sell order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    pub quantity: Quantity,
    pub price: Amount,
}

/// Port for order matching rules
///
/// The venue decides *which* orders meet (best bid against best ask,
/// price-time priority); the algorithm decides *whether* they cross and
/// at what price and size they trade.
pub trait MatchingAlgorithm: Send + Sync {
    /// Check if two orders can match
    fn can_match(&self, buy_order: &Order, sell_order: &Order) -> bool;

    /// Match two orders and return the fill
    fn match_orders(&self, buy_order: &Order, sell_order: &Order) -> MatchingResult<Fill>;

    /// Get the name of the algorithm
    fn name(&self) -> &str;
}
