use bases_core::{Amount, InstrumentId, Order, OrderId, Quantity, Side};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Order book for a single instrument
///
/// Both sides keep price levels in a `BTreeMap` whose first key is the best
/// price; each level is a FIFO queue ordered by (submission tick, order id).
#[derive(Debug, Clone)]
pub struct OrderBook {
    instrument: InstrumentId,
    /// Bids sorted by price descending (highest first)
    bids: BTreeMap<PriceKey, VecDeque<Order>>,
    /// Asks sorted by price ascending (lowest first)
    asks: BTreeMap<PriceKey, VecDeque<Order>>,
    /// Quick lookup for orders by ID
    order_index: HashMap<OrderId, (Side, Amount)>,
    /// Matching suspended after a settlement failure
    halted: bool,
}

/// Price key for BTreeMap ordering
/// For bids: reversed so the highest price sorts first
/// For asks: natural order (ascending)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PriceKey {
    price: Amount,
    is_bid: bool,
}

impl PriceKey {
    fn new(side: Side, price: Amount) -> Self {
        PriceKey {
            price,
            is_bid: side == Side::Buy,
        }
    }
}

impl Ord for PriceKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        if self.is_bid {
            other.price.cmp(&self.price)
        } else {
            self.price.cmp(&other.price)
        }
    }
}

impl PartialOrd for PriceKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Aggregated resting quantity at one price
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepthLevel {
    pub price: Amount,
    pub quantity: Quantity,
    pub orders: usize,
}

/// Top-of-book levels for both sides, best first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookDepth {
    pub instrument: InstrumentId,
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
    /// Best ask minus best bid, when both sides rest and do not cross
    pub spread: Option<Amount>,
    pub halted: bool,
}

impl OrderBook {
    pub fn new(instrument: InstrumentId) -> Self {
        OrderBook {
            instrument,
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            order_index: HashMap::new(),
            halted: false,
        }
    }

    pub fn instrument(&self) -> &InstrumentId {
        &self.instrument
    }

    fn side_mut(&mut self, side: Side) -> &mut BTreeMap<PriceKey, VecDeque<Order>> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    fn side(&self, side: Side) -> &BTreeMap<PriceKey, VecDeque<Order>> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    /// Rest an order on the book, keeping time priority within its level
    pub fn insert(&mut self, order: Order) {
        let key = PriceKey::new(order.side, order.limit_price);
        self.order_index
            .insert(order.id, (order.side, order.limit_price));

        let queue = self.side_mut(order.side).entry(key).or_default();
        let position = queue
            .iter()
            .position(|resting| order.precedes(resting))
            .unwrap_or(queue.len());
        queue.insert(position, order);
    }

    /// Remove an order from the book
    pub fn remove(&mut self, order_id: OrderId) -> Option<Order> {
        let (side, price) = self.order_index.remove(&order_id)?;
        let key = PriceKey::new(side, price);

        let levels = self.side_mut(side);
        let queue = levels.get_mut(&key)?;
        let pos = queue.iter().position(|o| o.id == order_id)?;
        let order = queue.remove(pos)?;
        if queue.is_empty() {
            levels.remove(&key);
        }
        Some(order)
    }

    /// Get an order by ID
    pub fn get(&self, order_id: OrderId) -> Option<&Order> {
        let (side, price) = self.order_index.get(&order_id)?;
        self.side(*side)
            .get(&PriceKey::new(*side, *price))?
            .iter()
            .find(|o| o.id == order_id)
    }

    /// Highest-priority order on a side
    pub fn best(&self, side: Side) -> Option<&Order> {
        self.side(side)
            .first_key_value()
            .and_then(|(_, queue)| queue.front())
    }

    /// Apply a fill to the highest-priority order on a side.
    /// Returns the order if the fill completed it (it leaves the book).
    pub fn fill_best(&mut self, side: Side, quantity: Quantity) -> Option<Order> {
        let filled = {
            let mut entry = self.side_mut(side).first_entry()?;
            let queue = entry.get_mut();
            let front = queue.front_mut()?;
            front.apply_fill(quantity);
            if !front.is_filled() {
                return None;
            }

            let filled = queue.pop_front()?;
            if queue.is_empty() {
                entry.remove();
            }
            filled
        };

        self.order_index.remove(&filled.id);
        Some(filled)
    }

    /// Best bid price (highest buy order)
    pub fn best_bid(&self) -> Option<Amount> {
        self.bids.first_key_value().map(|(k, _)| k.price)
    }

    /// Best ask price (lowest sell order)
    pub fn best_ask(&self) -> Option<Amount> {
        self.asks.first_key_value().map(|(k, _)| k.price)
    }

    /// Spread between best ask and best bid
    pub fn spread(&self) -> Option<Amount> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) if ask > bid => Some(ask - bid),
            _ => None,
        }
    }

    /// Top `levels` price levels on each side
    pub fn depth(&self, levels: usize) -> BookDepth {
        BookDepth {
            instrument: self.instrument.clone(),
            bids: summarize(&self.bids, levels),
            asks: summarize(&self.asks, levels),
            spread: self.spread(),
            halted: self.halted,
        }
    }

    /// All resting orders, bids then asks, each in priority order
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.bids
            .values()
            .flatten()
            .chain(self.asks.values().flatten())
    }

    pub fn len(&self) -> usize {
        self.order_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order_index.is_empty()
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn halt(&mut self) {
        self.halted = true;
    }

    pub fn resume(&mut self) {
        self.halted = false;
    }
}

fn summarize(book: &BTreeMap<PriceKey, VecDeque<Order>>, levels: usize) -> Vec<DepthLevel> {
    book.iter()
        .take(levels)
        .map(|(key, queue)| DepthLevel {
            price: key.price,
            quantity: queue.iter().map(Order::remaining_quantity).sum(),
            orders: queue.len(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bases_core::{OrderRequest, Tick};

    fn order(id: u64, request: OrderRequest, tick: Tick) -> Order {
        Order::from_request(OrderId(id), request, tick)
    }

    fn buy(id: u64, qty: Quantity, price: i64, tick: Tick) -> Order {
        order(id, OrderRequest::buy("a", "X", qty, Amount::from_minor(price)), tick)
    }

    fn sell(id: u64, qty: Quantity, price: i64, tick: Tick) -> Order {
        order(id, OrderRequest::sell("b", "X", qty, Amount::from_minor(price)), tick)
    }

    #[test]
    fn test_best_prices() {
        let mut book = OrderBook::new(InstrumentId::new("X"));
        book.insert(buy(1, 5, 10, 0));
        book.insert(buy(2, 5, 12, 0));
        book.insert(sell(3, 5, 15, 0));
        book.insert(sell(4, 5, 14, 0));

        assert_eq!(book.best_bid(), Some(Amount::from_minor(12)));
        assert_eq!(book.best_ask(), Some(Amount::from_minor(14)));
        assert_eq!(book.spread(), Some(Amount::from_minor(2)));
        assert_eq!(book.best(Side::Buy).map(|o| o.id), Some(OrderId(2)));
        assert_eq!(book.len(), 4);
    }

    #[test]
    fn test_time_priority_within_level() {
        let mut book = OrderBook::new(InstrumentId::new("X"));
        // Inserted out of order; the earlier submission still goes first
        book.insert(buy(2, 5, 10, 2));
        book.insert(buy(1, 5, 10, 1));

        assert_eq!(book.best(Side::Buy).map(|o| o.id), Some(OrderId(1)));
    }

    #[test]
    fn test_fill_best_pops_completed_orders() {
        let mut book = OrderBook::new(InstrumentId::new("X"));
        book.insert(sell(1, 5, 10, 0));
        book.insert(sell(2, 5, 10, 1));

        assert!(book.fill_best(Side::Sell, 3).is_none());
        assert_eq!(book.get(OrderId(1)).map(|o| o.remaining_quantity()), Some(2));

        let done = book.fill_best(Side::Sell, 2).unwrap();
        assert_eq!(done.id, OrderId(1));
        assert!(done.is_filled());
        assert!(book.get(OrderId(1)).is_none());
        assert_eq!(book.best(Side::Sell).map(|o| o.id), Some(OrderId(2)));
    }

    #[test]
    fn test_remove_clears_empty_level() {
        let mut book = OrderBook::new(InstrumentId::new("X"));
        book.insert(buy(1, 5, 10, 0));

        let removed = book.remove(OrderId(1)).unwrap();
        assert_eq!(removed.id, OrderId(1));
        assert!(book.is_empty());
        assert_eq!(book.best_bid(), None);
        assert!(book.remove(OrderId(1)).is_none());
    }

    #[test]
    fn test_depth_aggregates_levels() {
        let mut book = OrderBook::new(InstrumentId::new("X"));
        book.insert(buy(1, 5, 10, 0));
        book.insert(buy(2, 3, 10, 1));
        book.insert(buy(3, 7, 9, 1));
        book.insert(sell(4, 2, 11, 1));

        let depth = book.depth(1);
        assert_eq!(
            depth.bids,
            vec![DepthLevel {
                price: Amount::from_minor(10),
                quantity: 8,
                orders: 2
            }]
        );
        assert_eq!(depth.asks.len(), 1);
        assert_eq!(depth.spread, Some(Amount::from_minor(1)));
        assert_eq!(book.depth(10).bids.len(), 2);
    }
}
