use serde::{Deserialize, Serialize};

use crate::values::{AccountId, Amount, CommitmentId, OpportunityId, Rate, Tick};

/// Commitment lifecycle: active → matured | failed | cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommitmentStatus {
    /// Capital locked, waiting for maturity
    Active,
    /// Paid out capital plus return
    Matured,
    /// Matured with a loss
    Failed,
    /// Released before maturity
    Cancelled,
}

impl CommitmentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CommitmentStatus::Active)
    }
}

/// Binding allocation of capital to an opportunity, pending maturation
///
/// Holds the opportunity by id only; the generator owns the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpansionCommitment {
    pub id: CommitmentId,
    pub opportunity_id: OpportunityId,
    pub account: AccountId,
    /// Capital reserved in the ledger while active
    pub capital: Amount,
    pub expected_return: Rate,
    pub committed_at: Tick,
    pub maturity_tick: Tick,
    pub status: CommitmentStatus,
    /// Tick at which the commitment left the active state
    pub settled_at: Option<Tick>,
    /// Amount paid to the account on success
    pub payout: Option<Amount>,
    /// Amount taken from the account on failure
    pub loss: Option<Amount>,
}

impl ExpansionCommitment {
    pub fn is_due(&self, tick: Tick) -> bool {
        self.status == CommitmentStatus::Active && self.maturity_tick <= tick
    }
}
