use bases_core::{Amount, Order};
use bases_ports::{Fill, MatchingAlgorithm, MatchingError, MatchingResult};

use crate::{crosses, match_quantity};

/// Midpoint matching
///
/// Same eligibility and priority as price-time, but the two sides split the
/// spread: the clearing price is the midpoint of the two limits, rounded
/// down to the minor unit so it never exceeds the buyer's reservation.
#[derive(Debug, Default)]
pub struct MidpointMatching;

impl MidpointMatching {
    pub fn new() -> Self {
        Self
    }
}

impl MatchingAlgorithm for MidpointMatching {
    fn name(&self) -> &str {
        "Midpoint"
    }

    fn can_match(&self, buy_order: &Order, sell_order: &Order) -> bool {
        crosses(buy_order, sell_order)
    }

    fn match_orders(&self, buy_order: &Order, sell_order: &Order) -> MatchingResult<Fill> {
        if !self.can_match(buy_order, sell_order) {
            return Err(MatchingError::CannotMatch(
                "Price or instrument mismatch".to_string(),
            ));
        }

        let quantity = match_quantity(buy_order, sell_order)?;
        let bid = buy_order.limit_price.minor();
        let ask = sell_order.limit_price.minor();
        // bid >= ask, so this cannot overflow
        let price = Amount::from_minor(ask + (bid - ask) / 2);

        Ok(Fill { quantity, price })
    }
}
