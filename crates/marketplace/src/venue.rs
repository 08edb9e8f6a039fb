use crate::error::{VenueError, VenueResult};
use crate::order_book::{BookDepth, OrderBook};
use crate::report::{CancelOutcome, MatchReport, SettlementFailure};
use bases_core::{
    Amount, CancelReason, IdSequence, InstrumentId, Order, OrderId, OrderRequest, OrderStatus,
    PostingReason, Side, Tick, Trade, TradeId,
};
use bases_finance::Ledger;
use bases_matching::{Fill, MatchingAlgorithm, PriceTimeMatching};
use bases_ports::{LedgerError, LedgerResult};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Matching venue
///
/// One order book per listed instrument, each behind its own mutex so
/// submissions to different instruments never contend. Buy orders reserve
/// `quantity * limit_price` on submission; every trade is settled against
/// the ledger from that reservation before the book is updated.
///
/// Lock order is always book, then ledger accounts.
pub struct Venue {
    ledger: Arc<Ledger>,
    matcher: Arc<dyn MatchingAlgorithm>,
    books: DashMap<InstrumentId, Arc<Mutex<OrderBook>>>,
    /// Instrument of every resting order
    locations: DashMap<OrderId, InstrumentId>,
    /// Final status of every order that left the book
    retired: DashMap<OrderId, OrderStatus>,
    order_ids: IdSequence,
    trade_ids: IdSequence,
    tick: AtomicU64,
}

impl Venue {
    /// Create a venue with price-time priority matching
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self::with_matcher(ledger, Arc::new(PriceTimeMatching::new()))
    }

    pub fn with_matcher(ledger: Arc<Ledger>, matcher: Arc<dyn MatchingAlgorithm>) -> Self {
        info!("Venue using {} matching", matcher.name());
        Self {
            ledger,
            matcher,
            books: DashMap::new(),
            locations: DashMap::new(),
            retired: DashMap::new(),
            order_ids: IdSequence::new(),
            trade_ids: IdSequence::new(),
            tick: AtomicU64::new(0),
        }
    }

    pub fn matcher_name(&self) -> &str {
        self.matcher.name()
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Set the tick stamped on new orders and trades
    pub fn set_tick(&self, tick: Tick) {
        self.tick.store(tick, Ordering::SeqCst);
    }

    pub fn current_tick(&self) -> Tick {
        self.tick.load(Ordering::SeqCst)
    }

    /// Open a book for `instrument`. Returns false if already listed.
    pub fn list_instrument(&self, instrument: impl Into<InstrumentId>) -> bool {
        let instrument = instrument.into();
        match self.books.entry(instrument.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(OrderBook::new(instrument.clone()))));
                info!("Listed instrument {}", instrument);
                true
            }
        }
    }

    pub fn is_listed(&self, instrument: &InstrumentId) -> bool {
        self.books.contains_key(instrument)
    }

    /// Listed instruments in id order
    pub fn instruments(&self) -> Vec<InstrumentId> {
        let mut instruments: Vec<InstrumentId> =
            self.books.iter().map(|entry| entry.key().clone()).collect();
        instruments.sort();
        instruments
    }

    fn book(&self, instrument: &InstrumentId) -> Option<Arc<Mutex<OrderBook>>> {
        self.books.get(instrument).map(|entry| Arc::clone(entry.value()))
    }

    /// Validate, reserve and rest an order on its book
    ///
    /// Fails with `InvalidOrder` for non-positive quantity or price or an
    /// unlisted instrument, and with `InsufficientFunds` if a buy cannot be
    /// reserved. Nothing is left behind on failure.
    pub fn submit(&self, request: OrderRequest) -> VenueResult<Order> {
        if request.quantity <= 0 {
            return Err(VenueError::InvalidOrder(format!(
                "quantity must be positive, got {}",
                request.quantity
            )));
        }
        if !request.limit_price.is_positive() {
            return Err(VenueError::InvalidOrder(format!(
                "limit price must be positive, got {}",
                request.limit_price
            )));
        }
        let book = self.book(&request.instrument).ok_or_else(|| {
            VenueError::InvalidOrder(format!("instrument {} is not listed", request.instrument))
        })?;

        let value = request
            .limit_price
            .checked_mul_qty(request.quantity)
            .ok_or_else(|| VenueError::InvalidOrder("order value overflows".to_string()))?;
        let reservation = if request.side.reserves_funds() {
            value
        } else {
            Amount::ZERO
        };
        if self.ledger.balance_of(&request.account).is_closed() {
            return Err(LedgerError::AccountClosed(request.account).into());
        }

        let mut book = book.lock();
        if reservation.is_positive() {
            self.ledger.reserve(&request.account, reservation)?;
        }

        let order = Order::from_request(self.order_ids.next(), request, self.current_tick());
        self.locations.insert(order.id, order.instrument.clone());
        book.insert(order.clone());

        debug!(
            "Accepted {} {} {} {} @ {} for {} (reserved {})",
            order.id,
            order.side,
            order.quantity,
            order.instrument,
            order.limit_price,
            order.account,
            reservation
        );
        Ok(order)
    }

    /// Cancel on behalf of the submitting account
    pub fn cancel(&self, order_id: OrderId) -> VenueResult<CancelOutcome> {
        self.cancel_with_reason(order_id, CancelReason::Requested)
    }

    /// Remove a resting order and release whatever it still reserves
    ///
    /// Already filled, already cancelled and unknown orders are reported
    /// through the outcome and change nothing.
    pub fn cancel_with_reason(
        &self,
        order_id: OrderId,
        reason: CancelReason,
    ) -> VenueResult<CancelOutcome> {
        let Some(instrument) = self.locations.get(&order_id).map(|e| e.value().clone()) else {
            return Ok(self.retired_outcome(order_id));
        };
        let Some(book) = self.book(&instrument) else {
            return Ok(CancelOutcome::Unknown);
        };

        let mut book = book.lock();
        let Some(mut order) = book.remove(order_id) else {
            // Matched away between the lookup and the lock
            drop(book);
            return Ok(self.retired_outcome(order_id));
        };

        let released = order.reserved_remaining();
        if released.is_positive() {
            if let Err(err) = self.ledger.release(&order.account, released) {
                book.insert(order);
                return Err(err.into());
            }
        }

        order.status = OrderStatus::Cancelled(reason);
        debug!("Cancelled {} ({:?}), released {}", order_id, reason, released);
        self.retire(order);
        Ok(CancelOutcome::Cancelled { released })
    }

    fn retired_outcome(&self, order_id: OrderId) -> CancelOutcome {
        match self.order_status(order_id) {
            Some(OrderStatus::Filled) => CancelOutcome::AlreadyFilled,
            Some(OrderStatus::Cancelled(_)) => CancelOutcome::AlreadyCancelled,
            _ => CancelOutcome::Unknown,
        }
    }

    fn retire(&self, order: Order) {
        self.retired.insert(order.id, order.status);
        self.locations.remove(&order.id);
    }

    /// One matching pass over every listed, non-halted instrument
    ///
    /// Instruments are visited in id order. Within a book the best bid and
    /// best ask are paired repeatedly while they cross.
    pub fn match_tick(&self) -> MatchReport {
        let tick = self.current_tick();
        let mut report = MatchReport::new(tick);

        for instrument in self.instruments() {
            let Some(book) = self.book(&instrument) else {
                continue;
            };
            let mut book = book.lock();
            if book.is_halted() {
                debug!("Skipping halted instrument {}", instrument);
                continue;
            }
            self.match_book(&mut book, tick, &mut report);
        }

        if !report.trades.is_empty() {
            info!(
                "Tick {}: {} trades, volume {}, notional {}",
                tick,
                report.trades.len(),
                report.volume(),
                report.notional()
            );
        }
        report
    }

    fn match_book(&self, book: &mut OrderBook, tick: Tick, report: &mut MatchReport) {
        loop {
            let (buy, sell) = match (book.best(Side::Buy), book.best(Side::Sell)) {
                (Some(buy), Some(sell)) => (buy.clone(), sell.clone()),
                _ => return,
            };
            if !self.matcher.can_match(&buy, &sell) {
                return;
            }

            let fill = match self.matcher.match_orders(&buy, &sell) {
                Ok(fill) => fill,
                Err(err) => {
                    warn!("{}: {} vs {} did not match: {}", book.instrument(), buy.id, sell.id, err);
                    return;
                }
            };

            match self.settle(&buy, &sell, fill, tick) {
                Ok(trade) => {
                    let done = [
                        book.fill_best(Side::Buy, fill.quantity),
                        book.fill_best(Side::Sell, fill.quantity),
                    ];
                    for order in done.into_iter().flatten() {
                        self.retire(order);
                    }
                    report.trades.push(trade);
                }
                Err(err) => {
                    error!(
                        "Settlement failed on {} for {} vs {}: {}; halting instrument",
                        book.instrument(),
                        buy.id,
                        sell.id,
                        err
                    );
                    report.settlement_failures.push(SettlementFailure {
                        instrument: book.instrument().clone(),
                        buy_order_id: buy.id,
                        sell_order_id: sell.id,
                        buyer: buy.account.clone(),
                        seller: sell.account.clone(),
                        quantity: fill.quantity,
                        price: fill.price,
                        tick,
                        reason: err.to_string(),
                    });
                    self.abort(book, buy.id);
                    self.abort(book, sell.id);
                    book.halt();
                    return;
                }
            }
        }
    }

    /// Post the trade from the buyer's reservation. Nothing changes on error.
    fn settle(&self, buy: &Order, sell: &Order, fill: Fill, tick: Tick) -> LedgerResult<Trade> {
        let held = buy
            .limit_price
            .checked_mul_qty(fill.quantity)
            .ok_or_else(|| LedgerError::Overflow(buy.account.clone()))?;
        let notional = fill
            .price
            .checked_mul_qty(fill.quantity)
            .ok_or_else(|| LedgerError::Overflow(buy.account.clone()))?;

        let trade_id: TradeId = self.trade_ids.next();
        self.ledger.post_from_reserved(
            &buy.account,
            &sell.account,
            held,
            notional,
            PostingReason::Trade(trade_id),
        )?;

        Ok(Trade {
            id: trade_id,
            instrument: buy.instrument.clone(),
            buy_order_id: buy.id,
            sell_order_id: sell.id,
            buyer: buy.account.clone(),
            seller: sell.account.clone(),
            quantity: fill.quantity,
            price: fill.price,
            tick,
        })
    }

    /// Cancel one side of a failed settlement, releasing what is left of
    /// its reservation
    fn abort(&self, book: &mut OrderBook, order_id: OrderId) {
        let Some(mut order) = book.remove(order_id) else {
            return;
        };

        let remaining = order.reserved_remaining();
        let held = self.ledger.balance_of(&order.account).reserved;
        let release = remaining.min(held);
        if release < remaining {
            error!(
                "{} expected {} reserved on {} but only {} is held",
                order_id, remaining, order.account, held
            );
        }
        if release.is_positive() {
            if let Err(err) = self.ledger.release(&order.account, release) {
                error!("Could not release {} for {}: {}", release, order_id, err);
            }
        }

        order.status = OrderStatus::Cancelled(CancelReason::SettlementFailure);
        self.retire(order);
    }

    /// Re-enable matching on a halted instrument. Returns false if the
    /// instrument is unknown or was not halted.
    pub fn resume_instrument(&self, instrument: &InstrumentId) -> bool {
        let Some(book) = self.book(instrument) else {
            return false;
        };
        let mut book = book.lock();
        if !book.is_halted() {
            return false;
        }
        book.resume();
        info!("Resumed matching on {}", instrument);
        true
    }

    /// Instruments whose matching is suspended, in id order
    pub fn halted_instruments(&self) -> Vec<InstrumentId> {
        self.instruments()
            .into_iter()
            .filter(|instrument| {
                self.book(instrument)
                    .map(|book| book.lock().is_halted())
                    .unwrap_or(false)
            })
            .collect()
    }

    /// A resting order. Orders that left the book keep only their status.
    pub fn order(&self, order_id: OrderId) -> Option<Order> {
        let instrument = self.locations.get(&order_id).map(|e| e.value().clone())?;
        self.book(&instrument)
            .and_then(|book| book.lock().get(order_id).cloned())
    }

    /// Status of a resting or retired order
    pub fn order_status(&self, order_id: OrderId) -> Option<OrderStatus> {
        self.order(order_id)
            .map(|order| order.status)
            .or_else(|| self.retired.get(&order_id).map(|e| *e.value()))
    }

    /// Spread of a listed instrument's book, if both sides rest
    pub fn spread(&self, instrument: &InstrumentId) -> Option<Amount> {
        self.book(instrument).and_then(|book| book.lock().spread())
    }

    /// Every resting order, ordered by id
    pub fn open_orders(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .instruments()
            .iter()
            .filter_map(|instrument| self.book(instrument))
            .flat_map(|book| book.lock().orders().cloned().collect::<Vec<_>>())
            .collect();
        orders.sort_by_key(|order| order.id);
        orders
    }

    /// Resting orders submitted by `account`, ordered by id
    pub fn open_orders_for(&self, account: &bases_core::AccountId) -> Vec<Order> {
        self.open_orders()
            .into_iter()
            .filter(|order| &order.account == account)
            .collect()
    }

    pub fn open_order_count(&self) -> usize {
        self.locations.len()
    }

    pub fn best_bid(&self, instrument: &InstrumentId) -> Option<Amount> {
        self.book(instrument).and_then(|book| book.lock().best_bid())
    }

    pub fn best_ask(&self, instrument: &InstrumentId) -> Option<Amount> {
        self.book(instrument).and_then(|book| book.lock().best_ask())
    }

    pub fn depth(&self, instrument: &InstrumentId, levels: usize) -> Option<BookDepth> {
        self.book(instrument).map(|book| book.lock().depth(levels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bases_core::AccountId;

    fn setup() -> (Arc<Ledger>, Venue) {
        let ledger = Arc::new(Ledger::new());
        ledger.deposit(&AccountId::from("alice"), Amount::from_minor(1000)).unwrap();
        let venue = Venue::new(Arc::clone(&ledger));
        venue.list_instrument("WIDGET");
        (ledger, venue)
    }

    #[test]
    fn test_list_instrument_is_idempotent() {
        let (_, venue) = setup();
        assert!(!venue.list_instrument("WIDGET"));
        assert!(venue.list_instrument("GADGET"));
        assert_eq!(
            venue.instruments(),
            vec![InstrumentId::new("GADGET"), InstrumentId::new("WIDGET")]
        );
    }

    #[test]
    fn test_submit_validates() {
        let (_, venue) = setup();
        let zero_qty = OrderRequest::buy("alice", "WIDGET", 0, Amount::from_minor(5));
        let zero_price = OrderRequest::buy("alice", "WIDGET", 1, Amount::ZERO);
        let unlisted = OrderRequest::sell("alice", "NOPE", 1, Amount::from_minor(5));

        assert!(matches!(venue.submit(zero_qty), Err(VenueError::InvalidOrder(_))));
        assert!(matches!(venue.submit(zero_price), Err(VenueError::InvalidOrder(_))));
        assert!(matches!(venue.submit(unlisted), Err(VenueError::InvalidOrder(_))));
        assert_eq!(venue.open_order_count(), 0);
    }

    #[test]
    fn test_buy_reserves_sell_does_not() {
        let (ledger, venue) = setup();
        venue
            .submit(OrderRequest::buy("alice", "WIDGET", 4, Amount::from_minor(25)))
            .unwrap();
        venue
            .submit(OrderRequest::sell("bob", "WIDGET", 4, Amount::from_minor(30)))
            .unwrap();

        assert_eq!(ledger.balance_of(&AccountId::from("alice")).reserved, Amount::from_minor(100));
        assert_eq!(ledger.balance_of(&AccountId::from("bob")).reserved, Amount::ZERO);
        assert_eq!(venue.best_bid(&"WIDGET".into()), Some(Amount::from_minor(25)));
        assert_eq!(venue.best_ask(&"WIDGET".into()), Some(Amount::from_minor(30)));
    }

    #[test]
    fn test_insufficient_funds_leaves_no_entry() {
        let (ledger, venue) = setup();
        let err = venue
            .submit(OrderRequest::buy("alice", "WIDGET", 11, Amount::from_minor(100)))
            .unwrap_err();

        assert!(matches!(err, VenueError::InsufficientFunds { .. }));
        assert_eq!(venue.open_order_count(), 0);
        assert_eq!(ledger.balance_of(&AccountId::from("alice")).reserved, Amount::ZERO);
    }

    #[test]
    fn test_cancel_outcomes() {
        let (_, venue) = setup();
        let order = venue
            .submit(OrderRequest::buy("alice", "WIDGET", 2, Amount::from_minor(10)))
            .unwrap();

        assert_eq!(
            venue.cancel(order.id).unwrap(),
            CancelOutcome::Cancelled {
                released: Amount::from_minor(20)
            }
        );
        assert_eq!(venue.cancel(order.id).unwrap(), CancelOutcome::AlreadyCancelled);
        assert_eq!(venue.cancel(OrderId(999)).unwrap(), CancelOutcome::Unknown);
        assert_eq!(
            venue.order_status(order.id),
            Some(OrderStatus::Cancelled(CancelReason::Requested))
        );
        assert!(venue.order(order.id).is_none());
        assert_eq!(venue.order_status(OrderId(999)), None);
    }

    #[test]
    fn test_no_cross_no_trade() {
        let (_, venue) = setup();
        venue
            .submit(OrderRequest::buy("alice", "WIDGET", 1, Amount::from_minor(9)))
            .unwrap();
        venue
            .submit(OrderRequest::sell("bob", "WIDGET", 1, Amount::from_minor(10)))
            .unwrap();

        let report = venue.match_tick();
        assert!(report.trades.is_empty());
        assert!(report.is_clean());
        assert_eq!(venue.open_order_count(), 2);
        assert_eq!(venue.spread(&"WIDGET".into()), Some(Amount::from_minor(1)));
    }

    #[test]
    fn test_filled_orders_keep_only_status() {
        let (_, venue) = setup();
        let buy = venue
            .submit(OrderRequest::buy("alice", "WIDGET", 2, Amount::from_minor(10)))
            .unwrap();
        let sell = venue
            .submit(OrderRequest::sell("bob", "WIDGET", 2, Amount::from_minor(10)))
            .unwrap();

        assert_eq!(venue.match_tick().trades.len(), 1);
        assert!(venue.order(buy.id).is_none());
        assert!(venue.order(sell.id).is_none());
        assert_eq!(venue.order_status(buy.id), Some(OrderStatus::Filled));
        assert_eq!(venue.order_status(sell.id), Some(OrderStatus::Filled));
        assert_eq!(venue.cancel(buy.id).unwrap(), CancelOutcome::AlreadyFilled);
        assert_eq!(venue.spread(&"WIDGET".into()), None);
    }
}
