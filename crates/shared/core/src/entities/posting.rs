use serde::{Deserialize, Serialize};

use crate::values::{AccountId, Amount, CommitmentId, PostingId, Tick, TradeId};

/// Why funds moved
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostingReason {
    /// Seed funds issued by the market account
    Deposit,
    /// Settlement of a trade, buyer to seller
    Trade(TradeId),
    /// Committed capital consumed at successful maturation
    CapitalDrawdown(CommitmentId),
    /// Capital plus return paid out at successful maturation
    Payout(CommitmentId),
    /// Capital lost when a commitment fails
    Loss(CommitmentId),
    /// Free-form transfer between accounts
    Transfer(String),
}

/// One atomic, immutable funds movement in the ledger log
///
/// Every posting debits `from` and credits `to` by the same amount, so
/// postings net to zero across all accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub id: PostingId,
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Amount,
    pub tick: Tick,
    pub reason: PostingReason,
}
