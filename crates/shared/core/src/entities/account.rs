use serde::{Deserialize, Serialize};

use crate::values::{AccountId, Amount, Tick};

/// Account lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccountStatus {
    #[default]
    Open,
    /// Soft-closed: retained for audit, rejects new reservations and postings
    Closed,
}

/// Ledger account
///
/// `balance` is the total held (available + reserved). Every mutation bumps
/// `version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub balance: Amount,
    pub reserved: Amount,
    pub version: u64,
    pub status: AccountStatus,
    pub opened_at: Tick,
}

impl Account {
    pub fn new(id: AccountId, opened_at: Tick) -> Self {
        Self {
            id,
            balance: Amount::ZERO,
            reserved: Amount::ZERO,
            version: 0,
            status: AccountStatus::Open,
            opened_at,
        }
    }

    /// Spendable funds: balance minus reservations
    pub fn available(&self) -> Amount {
        self.balance - self.reserved
    }

    pub fn is_closed(&self) -> bool {
        self.status == AccountStatus::Closed
    }
}
