//! Per-instrument order book.
//!
//! One book per currency pair, two priority collections: `Forward` holds orders
//! offering the pair's first denomination, `Reverse` the second. Each collection is a
//! `BTreeMap` keyed by [`PriorityKey`], so iteration order is the matching order and is
//! the same on every node.

use crate::instrument::{BookSide, Instrument, InstrumentKey};
use crate::order::{Order, PriorityKey};
use crate::types::{Price, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregated depth at one price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Price,
    pub source_remaining: Decimal,
    pub order_count: usize,
}

/// Last trade seen on one direction of the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketData {
    pub last_price: Price,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone)]
pub struct OrderBook {
    key: InstrumentKey,
    forward: BTreeMap<PriorityKey, Order>,
    reverse: BTreeMap<PriorityKey, Order>,
    forward_market: Option<MarketData>,
    reverse_market: Option<MarketData>,
}

impl OrderBook {
    pub fn new(key: InstrumentKey) -> Self {
        Self {
            key,
            forward: BTreeMap::new(),
            reverse: BTreeMap::new(),
            forward_market: None,
            reverse_market: None,
        }
    }

    pub fn key(&self) -> &InstrumentKey {
        &self.key
    }

    pub fn instrument(&self, side: BookSide) -> Instrument {
        self.key.instrument(side)
    }

    pub fn side(&self, side: BookSide) -> &BTreeMap<PriorityKey, Order> {
        match side {
            BookSide::Forward => &self.forward,
            BookSide::Reverse => &self.reverse,
        }
    }

    fn side_mut(&mut self, side: BookSide) -> &mut BTreeMap<PriorityKey, Order> {
        match side {
            BookSide::Forward => &mut self.forward,
            BookSide::Reverse => &mut self.reverse,
        }
    }

    /// Places an order at its price-time position and returns that position.
    pub fn insert(&mut self, order: Order) -> PriorityKey {
        let key = order.priority_key();
        let side = order.instrument.side();
        self.side_mut(side).insert(key, order);
        key
    }

    pub fn remove(&mut self, side: BookSide, key: &PriorityKey) -> Option<Order> {
        self.side_mut(side).remove(key)
    }

    pub fn get(&self, side: BookSide, key: &PriorityKey) -> Option<&Order> {
        self.side(side).get(key)
    }

    pub fn get_mut(&mut self, side: BookSide, key: &PriorityKey) -> Option<&mut Order> {
        self.side_mut(side).get_mut(key)
    }

    /// Best resting order on one side: lowest asking price, then lowest id.
    pub fn best(&self, side: BookSide) -> Option<&Order> {
        self.side(side).values().next()
    }

    pub fn best_price(&self, side: BookSide) -> Option<Price> {
        self.best(side).map(Order::price)
    }

    /// Resting orders of one side in matching order.
    pub fn orders(&self, side: BookSide) -> impl Iterator<Item = &Order> {
        self.side(side).values()
    }

    /// Depth aggregated by exact price, best first.
    pub fn levels(&self, side: BookSide, max_levels: usize) -> Vec<PriceLevel> {
        let mut levels: Vec<PriceLevel> = Vec::new();
        let mut current: Option<PriorityKey> = None;

        for (key, order) in self.side(side) {
            let same_price = current.is_some_and(|c| c.cmp_price(key).is_eq());
            if !same_price {
                if levels.len() >= max_levels {
                    break;
                }
                current = Some(*key);
                levels.push(PriceLevel {
                    price: order.price(),
                    source_remaining: Decimal::ZERO,
                    order_count: 0,
                });
            }
            if let Some(level) = levels.last_mut() {
                level.source_remaining += order.source_remaining;
                level.order_count += 1;
            }
        }

        levels
    }

    pub fn market_data(&self, side: BookSide) -> Option<MarketData> {
        match side {
            BookSide::Forward => self.forward_market,
            BookSide::Reverse => self.reverse_market,
        }
    }

    /// Records a trade where `source` of `side`'s source denomination bought
    /// `destination` of the other. Both directions get their own price.
    pub fn record_trade(&mut self, side: BookSide, source: Decimal, destination: Decimal, timestamp: Timestamp) {
        let (Some(price), Some(inverse)) = (
            Price::from_amounts(source, destination),
            Price::from_amounts(destination, source),
        ) else {
            return;
        };
        let this = Some(MarketData { last_price: price, timestamp });
        let other = Some(MarketData { last_price: inverse, timestamp });
        match side {
            BookSide::Forward => {
                self.forward_market = this;
                self.reverse_market = other;
            }
            BookSide::Reverse => {
                self.reverse_market = this;
                self.forward_market = other;
            }
        }
    }

    pub fn order_count(&self) -> usize {
        self.forward.len() + self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty() && self.reverse.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrderType, TimeInForce};
    use crate::types::{AccountId, ClientOrderId, Denom, OrderId};
    use rust_decimal_macros::dec;

    fn eur_usd() -> Instrument {
        Instrument::new(Denom::new("eur").unwrap(), Denom::new("usd").unwrap()).unwrap()
    }

    fn ask(id: u64, source: Decimal, destination: Decimal) -> Order {
        Order::new(
            OrderId(id),
            AccountId(id),
            ClientOrderId::new(format!("c{id}")),
            eur_usd(),
            OrderType::Limit,
            TimeInForce::GoodTilCancel,
            source,
            destination,
            Timestamp::from_millis(0),
        )
    }

    #[test]
    fn empty_book() {
        let book = OrderBook::new(eur_usd().key());
        assert!(book.is_empty());
        assert!(book.best(BookSide::Forward).is_none());
        assert!(book.best_price(BookSide::Reverse).is_none());
        assert!(book.market_data(BookSide::Forward).is_none());
    }

    #[test]
    fn orders_sit_on_their_direction() {
        let mut book = OrderBook::new(eur_usd().key());
        book.insert(ask(1, dec!(100), dec!(120)));

        let mut bid = ask(2, dec!(60), dec!(50));
        bid.instrument = eur_usd().reversed();
        book.insert(bid);

        assert_eq!(book.side(BookSide::Forward).len(), 1);
        assert_eq!(book.side(BookSide::Reverse).len(), 1);
        assert_eq!(book.order_count(), 2);
    }

    #[test]
    fn price_time_priority() {
        let mut book = OrderBook::new(eur_usd().key());
        book.insert(ask(1, dec!(100), dec!(120)));
        book.insert(ask(2, dec!(100), dec!(120)));
        book.insert(ask(3, dec!(100), dec!(110)));

        let ids: Vec<u64> = book.orders(BookSide::Forward).map(|o| o.id.0).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(book.best_price(BookSide::Forward).unwrap().value(), dec!(1.1));
    }

    #[test]
    fn remove_by_key() {
        let mut book = OrderBook::new(eur_usd().key());
        let key = book.insert(ask(1, dec!(100), dec!(120)));

        assert!(book.get(BookSide::Forward, &key).is_some());
        let removed = book.remove(BookSide::Forward, &key).unwrap();
        assert_eq!(removed.id, OrderId(1));
        assert!(book.is_empty());
    }

    #[test]
    fn levels_group_equal_prices() {
        let mut book = OrderBook::new(eur_usd().key());
        book.insert(ask(1, dec!(100), dec!(120)));
        book.insert(ask(2, dec!(10), dec!(12)));
        book.insert(ask(3, dec!(100), dec!(130)));

        let levels = book.levels(BookSide::Forward, 10);
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].price.value(), dec!(1.2));
        assert_eq!(levels[0].source_remaining, dec!(110));
        assert_eq!(levels[0].order_count, 2);
        assert_eq!(levels[1].price.value(), dec!(1.3));
    }

    #[test]
    fn trades_update_both_directions() {
        let mut book = OrderBook::new(eur_usd().key());
        book.record_trade(BookSide::Reverse, dec!(60), dec!(50), Timestamp::from_millis(7));

        let reverse = book.market_data(BookSide::Reverse).unwrap();
        let forward = book.market_data(BookSide::Forward).unwrap();
        assert_eq!(forward.last_price.value(), dec!(1.2));
        assert_eq!(reverse.timestamp, Timestamp::from_millis(7));
        assert!(reverse.last_price.value() < dec!(1));
    }
}
