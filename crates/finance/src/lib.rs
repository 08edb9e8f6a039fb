//! SupportingBases Finance - the Ledger
//!
//! Holds every account balance and the append-only posting log:
//!
//! - **Accounts**: created on first reference, soft-closed, never deleted
//! - **Reservations**: funds earmarked for future settlement, excluded
//!   from the available balance
//! - **Postings**: immutable double-entry transfers; each one debits and
//!   credits the same amount, so the sum of all balances stays zero
//!
//! The market account is the issuer: seed deposits, maturation payouts and
//! losses flow through it, and it is the only account allowed to go
//! negative.

mod ledger;

pub use ledger::Ledger;

// Re-export the error types from ports for convenience
pub use bases_ports::{LedgerError, LedgerResult};
