use serde::{Deserialize, Serialize};

/// Why an order left the book without being filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CancelReason {
    /// Cancelled by the submitting account
    Requested,
    /// Cancelled because a trade against it could not be settled
    SettlementFailure,
    /// Withdrawn by the component that published it (e.g. an expired offer)
    Withdrawn,
}

/// Order lifecycle status
///
/// submitted → partially filled → filled / cancelled → removed from the book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Resting on the book, nothing filled yet
    Submitted,
    /// Some quantity filled, remainder resting
    PartiallyFilled,
    /// Completely filled
    Filled,
    /// Removed before completion
    Cancelled(CancelReason),
}

impl OrderStatus {
    /// Returns true if the order is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled(_))
    }

    /// Returns true if the order is still on the book
    pub fn is_active(&self) -> bool {
        matches!(self, OrderStatus::Submitted | OrderStatus::PartiallyFilled)
    }
}
