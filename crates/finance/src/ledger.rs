use bases_core::{Account, AccountId, AccountStatus, Amount, Posting, PostingId, PostingReason, Tick};
use bases_ports::{LedgerError, LedgerResult};
use dashmap::DashMap;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

type AccountCell = Arc<Mutex<Account>>;

/// Double-entry ledger
///
/// Thread-safe: accounts live in a `DashMap`, each behind its own mutex, so
/// operations on a given account are serialized while unrelated accounts
/// proceed in parallel. A transfer locks both accounts in id order and
/// appends to the log while holding them, so the log order matches the
/// order in which each account's balance changed.
pub struct Ledger {
    /// Accounts by ID
    accounts: DashMap<AccountId, AccountCell>,
    /// Append-only posting log
    log: Mutex<Vec<Posting>>,
    /// Tick stamped on new postings and accounts
    tick: AtomicU64,
}

impl Ledger {
    /// Create a ledger holding only the market account
    pub fn new() -> Self {
        let ledger = Self {
            accounts: DashMap::new(),
            log: Mutex::new(Vec::new()),
            tick: AtomicU64::new(0),
        };
        ledger.open(&AccountId::market());
        ledger
    }

    /// Set the tick stamped on subsequent postings
    pub fn set_tick(&self, tick: Tick) {
        self.tick.store(tick, Ordering::SeqCst);
    }

    pub fn current_tick(&self) -> Tick {
        self.tick.load(Ordering::SeqCst)
    }

    /// Get the account cell, creating the account on first reference
    fn cell(&self, id: &AccountId) -> AccountCell {
        if let Some(cell) = self.accounts.get(id) {
            return Arc::clone(cell.value());
        }

        let tick = self.current_tick();
        let entry = self.accounts.entry(id.clone()).or_insert_with(|| {
            debug!("Opening account {} at tick {}", id, tick);
            Arc::new(Mutex::new(Account::new(id.clone(), tick)))
        });
        Arc::clone(entry.value())
    }

    fn existing(&self, id: &AccountId) -> Option<AccountCell> {
        self.accounts.get(id).map(|cell| Arc::clone(cell.value()))
    }

    /// Open an account (idempotent) and return its current state
    pub fn open(&self, id: &AccountId) -> Account {
        self.cell(id).lock().clone()
    }

    /// Whether the account has ever been referenced
    pub fn is_known(&self, id: &AccountId) -> bool {
        self.accounts.contains_key(id)
    }

    /// Snapshot of an account. Unknown accounts read as empty and are not
    /// created by this call.
    pub fn balance_of(&self, id: &AccountId) -> Account {
        match self.existing(id) {
            Some(cell) => cell.lock().clone(),
            None => Account::new(id.clone(), self.current_tick()),
        }
    }

    /// Spendable balance (balance minus reservations)
    pub fn available_of(&self, id: &AccountId) -> Amount {
        self.balance_of(id).available()
    }

    /// Earmark funds for future settlement
    ///
    /// Fails with `InsufficientFunds` if the available balance is short;
    /// on failure nothing changes.
    pub fn reserve(&self, id: &AccountId, amount: Amount) -> LedgerResult<()> {
        ensure_positive(amount)?;
        if id.is_market() {
            return Err(LedgerError::MarketAccount("reserve"));
        }

        let cell = self.cell(id);
        let mut account = cell.lock();
        ensure_open(&account)?;
        ensure_covers(&account, account.reserved, amount)?;

        account.reserved = account
            .reserved
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(id.clone()))?;
        account.version += 1;

        debug!("Reserved {} on {} (reserved now {})", amount, id, account.reserved);
        Ok(())
    }

    /// Return reserved funds to the available balance
    pub fn release(&self, id: &AccountId, amount: Amount) -> LedgerResult<()> {
        ensure_positive(amount)?;

        let cell = self.cell(id);
        let mut account = cell.lock();
        if account.reserved < amount {
            return Err(LedgerError::ReservationUnderflow {
                account: id.clone(),
                requested: amount,
                reserved: account.reserved,
            });
        }

        account.reserved -= amount;
        account.version += 1;

        debug!("Released {} on {} (reserved now {})", amount, id, account.reserved);
        Ok(())
    }

    /// Move `amount` from one account to another and record the posting
    ///
    /// Fails with `InsufficientFunds` if the source's available balance
    /// (balance minus reserved) is short. All-or-nothing.
    pub fn post(
        &self,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
        reason: PostingReason,
    ) -> LedgerResult<Posting> {
        self.transfer(from, to, Amount::ZERO, amount, reason)
    }

    /// Release `held` from the source's reservation and post `amount` in one
    /// step, so the released funds cannot be spent by anyone else in between.
    ///
    /// Used to settle against funds earmarked earlier. `amount` may be less
    /// than `held`; the difference stays in the source's available balance.
    pub fn post_from_reserved(
        &self,
        from: &AccountId,
        to: &AccountId,
        held: Amount,
        amount: Amount,
        reason: PostingReason,
    ) -> LedgerResult<Posting> {
        ensure_positive(held)?;
        self.transfer(from, to, held, amount, reason)
    }

    fn transfer(
        &self,
        from: &AccountId,
        to: &AccountId,
        held: Amount,
        amount: Amount,
        reason: PostingReason,
    ) -> LedgerResult<Posting> {
        ensure_positive(amount)?;

        if from == to {
            let cell = self.cell(from);
            let mut account = cell.lock();
            ensure_open(&account)?;
            let reserved = unreserved(&account, held)?;
            ensure_covers(&account, reserved, amount)?;

            let posting = self.append(from, to, amount, reason);
            account.reserved = reserved;
            account.version += 1;
            return Ok(posting);
        }

        let source_cell = self.cell(from);
        let dest_cell = self.cell(to);

        // Lock in id order so opposite concurrent transfers cannot deadlock
        let (mut source, mut dest) = if from < to {
            let source = source_cell.lock();
            let dest = dest_cell.lock();
            (source, dest)
        } else {
            let dest = dest_cell.lock();
            let source = source_cell.lock();
            (source, dest)
        };

        ensure_open(&source)?;
        ensure_open(&dest)?;
        let source_reserved = unreserved(&source, held)?;
        ensure_covers(&source, source_reserved, amount)?;

        let source_balance = source
            .balance
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::Overflow(from.clone()))?;
        let dest_balance = dest
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::Overflow(to.clone()))?;

        let posting = self.append(from, to, amount, reason);

        source.balance = source_balance;
        source.reserved = source_reserved;
        source.version += 1;
        dest.balance = dest_balance;
        dest.version += 1;

        debug!("Posted {} {} -> {} ({:?})", posting.id, from, to, posting.reason);
        Ok(posting)
    }

    /// Seed funds from the market account
    pub fn deposit(&self, id: &AccountId, amount: Amount) -> LedgerResult<Posting> {
        self.post(&AccountId::market(), id, amount, PostingReason::Deposit)
    }

    /// Soft-close an account. It must hold no reservations.
    ///
    /// The record stays readable; new reservations and postings touching it
    /// fail with `AccountClosed`.
    pub fn close(&self, id: &AccountId) -> LedgerResult<Account> {
        if id.is_market() {
            return Err(LedgerError::MarketAccount("close"));
        }

        let cell = self.cell(id);
        let mut account = cell.lock();
        if account.reserved.is_positive() {
            return Err(LedgerError::ReservedFundsOutstanding(id.clone()));
        }
        if !account.is_closed() {
            account.status = AccountStatus::Closed;
            account.version += 1;
            info!("Closed account {} with balance {}", id, account.balance);
        }
        Ok(account.clone())
    }

    fn append(
        &self,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
        reason: PostingReason,
    ) -> Posting {
        let mut log = self.log.lock();
        let posting = Posting {
            id: PostingId(log.len() as u64 + 1),
            from: from.clone(),
            to: to.clone(),
            amount,
            tick: self.current_tick(),
            reason,
        };
        log.push(posting.clone());
        posting
    }

    /// Ordered copy of the full posting log
    pub fn postings(&self) -> Vec<Posting> {
        self.log.lock().clone()
    }

    /// Postings appended after `after` (exclusive), in log order
    pub fn postings_since(&self, after: PostingId) -> Vec<Posting> {
        let log = self.log.lock();
        let start = (after.raw() as usize).min(log.len());
        log[start..].to_vec()
    }

    /// Postings stamped with `tick`
    pub fn postings_at(&self, tick: Tick) -> Vec<Posting> {
        self.log
            .lock()
            .iter()
            .filter(|p| p.tick == tick)
            .cloned()
            .collect()
    }

    pub fn posting_count(&self) -> usize {
        self.log.lock().len()
    }

    /// Snapshot of every account, ordered by id
    pub fn accounts(&self) -> Vec<Account> {
        let cells: Vec<AccountCell> = self
            .accounts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut accounts: Vec<Account> = cells.iter().map(|cell| cell.lock().clone()).collect();
        accounts.sort_by(|a, b| a.id.cmp(&b.id));
        accounts
    }

    /// Sum of all balances, market account included. Always zero.
    pub fn total_supply(&self) -> Amount {
        self.accounts().iter().map(|a| a.balance).sum()
    }

    /// Sum of all reservations
    pub fn total_reserved(&self) -> Amount {
        self.accounts().iter().map(|a| a.reserved).sum()
    }

    /// Recompute every balance from the posting log and return the accounts
    /// whose stored balance disagrees with it
    pub fn reconcile(&self) -> Vec<AccountId> {
        let mut net: HashMap<AccountId, Amount> = HashMap::new();
        for posting in self.postings() {
            *net.entry(posting.from.clone()).or_default() -= posting.amount;
            *net.entry(posting.to.clone()).or_default() += posting.amount;
        }

        let mismatched: Vec<AccountId> = self
            .accounts()
            .into_iter()
            .filter(|account| net.get(&account.id).copied().unwrap_or_default() != account.balance)
            .map(|account| account.id)
            .collect();

        if !mismatched.is_empty() {
            warn!("Ledger reconciliation found {} mismatched accounts", mismatched.len());
        }
        mismatched
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_positive(amount: Amount) -> LedgerResult<()> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(LedgerError::InvalidAmount(amount))
    }
}

fn ensure_open(account: &Account) -> LedgerResult<()> {
    if account.is_closed() {
        Err(LedgerError::AccountClosed(account.id.clone()))
    } else {
        Ok(())
    }
}

/// Reservation left on the account once `held` is released
fn unreserved(account: &Account, held: Amount) -> LedgerResult<Amount> {
    if account.reserved < held {
        return Err(LedgerError::ReservationUnderflow {
            account: account.id.clone(),
            requested: held,
            reserved: account.reserved,
        });
    }
    Ok(account.reserved - held)
}

/// Check `amount` fits in the balance net of `reserved`.
/// The market account is the issuer and may go negative.
fn ensure_covers(account: &Account, reserved: Amount, amount: Amount) -> LedgerResult<()> {
    if account.id.is_market() {
        return Ok(());
    }
    let available = account.balance - reserved;
    if available < amount {
        return Err(LedgerError::InsufficientFunds {
            account: account.id.clone(),
            requested: amount,
            available,
        });
    }
    Ok(())
}
