use bases_core::Order;
use bases_ports::{Fill, MatchingAlgorithm, MatchingError, MatchingResult};

use crate::{crosses, match_quantity};

/// Standard price-time priority matching (FIFO)
///
/// Orders are matched based on:
/// 1. Best price (highest bid, lowest ask)
/// 2. Time priority (first in, first out at same price)
///
/// The resting (earlier-submitted) order sets the clearing price.
#[derive(Debug, Default)]
pub struct PriceTimeMatching;

impl PriceTimeMatching {
    pub fn new() -> Self {
        Self
    }
}

impl MatchingAlgorithm for PriceTimeMatching {
    fn name(&self) -> &str {
        "Price-Time Priority"
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

        // Resting order (older) sets the price
        let price = if buy_order.precedes(sell_order) {
            buy_order.limit_price
        } else {
            sell_order.limit_price
        };

        Ok(Fill { quantity, price })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bases_core::{Amount, OrderId, OrderRequest, Tick};

    fn order(id: u64, request: OrderRequest, tick: Tick) -> Order {
        Order::from_request(OrderId(id), request, tick)
    }

    #[test]
    fn test_resting_buy_sets_price() {
        let buy = order(1, OrderRequest::buy("a", "X", 5, Amount::from_minor(12)), 1);
        let sell = order(2, OrderRequest::sell("b", "X", 3, Amount::from_minor(10)), 2);

        let fill = PriceTimeMatching::new().match_orders(&buy, &sell).unwrap();
        assert_eq!(fill.quantity, 3);
        assert_eq!(fill.price, Amount::from_minor(12));
    }

    #[test]
    fn test_resting_sell_sets_price() {
        let sell = order(1, OrderRequest::sell("b", "X", 4, Amount::from_minor(10)), 1);
        let buy = order(2, OrderRequest::buy("a", "X", 9, Amount::from_minor(12)), 2);

        let fill = PriceTimeMatching::new().match_orders(&buy, &sell).unwrap();
        assert_eq!(fill.quantity, 4);
        assert_eq!(fill.price, Amount::from_minor(10));
    }

    #[test]
    fn test_same_tick_uses_submission_order() {
        let buy = order(7, OrderRequest::buy("a", "X", 1, Amount::from_minor(12)), 4);
        let sell = order(3, OrderRequest::sell("b", "X", 1, Amount::from_minor(10)), 4);

        let fill = PriceTimeMatching::new().match_orders(&buy, &sell).unwrap();
        assert_eq!(fill.price, Amount::from_minor(10));
    }

    #[test]
    fn test_no_cross() {
        let buy = order(1, OrderRequest::buy("a", "X", 1, Amount::from_minor(9)), 1);
        let sell = order(2, OrderRequest::sell("b", "X", 1, Amount::from_minor(10)), 1);

        let engine = PriceTimeMatching::new();
        assert!(!engine.can_match(&buy, &sell));
        assert!(matches!(
            engine.match_orders(&buy, &sell),
            Err(MatchingError::CannotMatch(_))
        ));
    }

    #[test]
    fn test_instrument_mismatch() {
        let buy = order(1, OrderRequest::buy("a", "X", 1, Amount::from_minor(10)), 1);
        let sell = order(2, OrderRequest::sell("b", "Y", 1, Amount::from_minor(10)), 1);
        assert!(!PriceTimeMatching::new().can_match(&buy, &sell));
    }
}
