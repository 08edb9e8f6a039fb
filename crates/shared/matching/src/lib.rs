//! SupportingBases Matching Rules
//!
//! Implementations of the `MatchingAlgorithm` port used by the venue.

mod midpoint;
mod price_time;

use std::sync::Arc;

pub use midpoint::MidpointMatching;
pub use price_time::PriceTimeMatching;

// Re-export the trait from ports for convenience
pub use bases_ports::{Fill, MatchingAlgorithm, MatchingError, MatchingResult};

/// Factory function to create matching algorithms by name
pub fn create_matching_algorithm(name: &str) -> MatchingResult<Arc<dyn MatchingAlgorithm>> {
    match name.to_lowercase().as_str() {
        "price-time" | "pricetime" | "fifo" => Ok(Arc::new(PriceTimeMatching::new())),
        "midpoint" => Ok(Arc::new(MidpointMatching::new())),
        other => Err(MatchingError::UnknownAlgorithm(other.to_string())),
    }
}

/// Shared eligibility check: same instrument, opposite sides, prices cross
fn crosses(buy_order: &bases_core::Order, sell_order: &bases_core::Order) -> bool {
    buy_order.instrument == sell_order.instrument
        && buy_order.side == bases_core::Side::Buy
        && sell_order.side == bases_core::Side::Sell
        && buy_order.limit_price >= sell_order.limit_price
}

/// Common quantity computation: min of the two remainders
fn match_quantity(
    buy_order: &bases_core::Order,
    sell_order: &bases_core::Order,
) -> MatchingResult<bases_core::Quantity> {
    let quantity = buy_order
        .remaining_quantity()
        .min(sell_order.remaining_quantity());
    if quantity <= 0 {
        return Err(MatchingError::NoQuantity);
    }
    Ok(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_by_name() {
        assert_eq!(
            create_matching_algorithm("price-time").unwrap().name(),
            "Price-Time Priority"
        );
        assert_eq!(create_matching_algorithm("MIDPOINT").unwrap().name(), "Midpoint");
        assert!(matches!(
            create_matching_algorithm("pro-rata"),
            Err(MatchingError::UnknownAlgorithm(_))
        ));
    }
}
