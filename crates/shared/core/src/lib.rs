//! SupportingBases Core Domain
//!
//! Pure domain types shared by every subsystem of the simulation:
//! ledger values, order book entities, opportunities and commitments.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{
    // Ledger
    Account,
    AccountStatus,
    // Marketplace
    CancelReason,
    // Expansion
    CommitmentStatus,
    ExpansionCommitment,
    // Opportunities
    Eligibility,
    Offer,
    Opportunity,
    OpportunitySpec,
    OpportunityStatus,
    Order,
    OrderRequest,
    OrderStatus,
    Posting,
    PostingReason,
    Side,
    Standing,
    StandingIndicators,
    Trade,
};
pub use values::{
    AccountId, Amount, CommitmentId, IdSequence, InstrumentId, OpportunityId, OrderId, PostingId,
    Quantity, Rate, Tick, TradeId,
};
