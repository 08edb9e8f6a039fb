//! Marketplace
//!
//! Matching venue for the simulation. Accounts submit limit orders against
//! listed instruments; each tick the venue pairs crossing orders under
//! price-time priority and settles every trade through the ledger.
//!
//! Buy orders reserve `quantity * limit_price` at submission, so settlement
//! can only fail if that reservation was disturbed. A failed settlement
//! cancels both orders and halts the instrument until it is resumed.

mod error;
mod order_book;
mod report;
mod venue;

pub use error::{VenueError, VenueResult};
pub use order_book::{BookDepth, DepthLevel, OrderBook};
pub use report::{CancelOutcome, MatchReport, SettlementFailure};
pub use venue::Venue;
