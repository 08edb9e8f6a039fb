use rust_decimal::Decimal;

mod amount;
mod ids;

pub use amount::Amount;
pub use ids::{
    AccountId, CommitmentId, IdSequence, InstrumentId, OpportunityId, OrderId, PostingId, TradeId,
};

/// Order quantity in whole instrument units
pub type Quantity = i64;

/// One discrete step of simulated time
pub type Tick = u64;

/// Fractional rate (expected return, loss fraction, probability)
/// e.g. `0.1` means 10%
pub type Rate = Decimal;
