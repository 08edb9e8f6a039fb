mod account;
mod commitment;
mod opportunity;
mod order;
mod order_status;
mod posting;
mod side;
mod standing;
mod trade;

pub use account::{Account, AccountStatus};
pub use commitment::{CommitmentStatus, ExpansionCommitment};
pub use opportunity::{Offer, Opportunity, OpportunitySpec, OpportunityStatus};
pub use order::{Order, OrderRequest};
pub use order_status::{CancelReason, OrderStatus};
pub use posting::{Posting, PostingReason};
pub use side::Side;
pub use standing::{Eligibility, Standing, StandingIndicators};
pub use trade::Trade;
