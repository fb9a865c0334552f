//! Read-only views of engine state. Nothing here mutates.

use super::core::Engine;
use super::results::{BookSummary, EngineError, InstrumentSummary};
use crate::bank::BalanceGateway;
use crate::book::PriceLevel;
use crate::index::OrderHandle;
use crate::instrument::BookSide;
use crate::order::Order;
use crate::types::{AccountId, ClientOrderId, OrderId};

impl<B: BalanceGateway> Engine<B> {
    fn order_at(&self, handle: &OrderHandle) -> Option<&Order> {
        self.registry
            .resolve_key(&handle.instrument)?
            .get(handle.side, &handle.key)
    }

    pub fn order(&self, order_id: OrderId) -> Option<&Order> {
        self.order_at(self.index.by_id(order_id)?)
    }

    pub fn order_by_client_id(&self, owner: AccountId, client_order_id: &ClientOrderId) -> Option<&Order> {
        self.order_at(self.index.by_client_order_id(owner, client_order_id)?)
    }

    /// Live orders of an account, oldest first.
    pub fn account_orders(&self, owner: AccountId) -> Vec<&Order> {
        self.index
            .owner_orders(owner)
            .into_iter()
            .filter_map(|handle| self.order_at(handle))
            .collect()
    }

    /// Resting orders offering `source` for `destination`, in matching order.
    pub fn instrument_orders(&self, source: &str, destination: &str) -> Result<Vec<&Order>, EngineError> {
        let instrument = self.registry.validate(source, destination)?;
        Ok(self
            .registry
            .resolve_key(&instrument.key())
            .map(|book| book.orders(instrument.side()).collect())
            .unwrap_or_default())
    }

    /// Every direction between registered denominations, books or not.
    pub fn instruments(&self) -> Vec<InstrumentSummary> {
        self.registry
            .pairs()
            .into_iter()
            .map(|instrument| {
                let book = self.registry.resolve_key(&instrument.key());
                let side = instrument.side();
                InstrumentSummary {
                    best_price: book.and_then(|b| b.best_price(side)),
                    last_trade: book.and_then(|b| b.market_data(side)),
                    resting_orders: book.map_or(0, |b| b.side(side).len()),
                    instrument,
                }
            })
            .collect()
    }

    pub fn best_of_book(&self, source: &str, destination: &str) -> Result<BookSummary, EngineError> {
        let mut levels = self.depth(source, destination, 1)?;
        let mut counter = self.depth(destination, source, 1)?;
        Ok(BookSummary {
            instrument: self.registry.validate(source, destination)?,
            best_offer: levels.pop(),
            best_counter_offer: counter.pop(),
        })
    }

    /// Aggregated depth of one direction, best price first.
    pub fn depth(&self, source: &str, destination: &str, max_levels: usize) -> Result<Vec<PriceLevel>, EngineError> {
        let instrument = self.registry.validate(source, destination)?;
        Ok(self
            .registry
            .resolve_key(&instrument.key())
            .map(|book| book.levels(instrument.side(), max_levels))
            .unwrap_or_default())
    }

    pub fn live_order_count(&self) -> usize {
        self.index.len()
    }

    /// Cross-checks the books against the index. Both must hold exactly the same orders.
    pub fn verify_consistency(&self) -> Result<(), String> {
        let mut on_books = 0;
        for book in self.registry.books() {
            for side in [BookSide::Forward, BookSide::Reverse] {
                for (key, order) in book.side(side) {
                    on_books += 1;
                    let Some(handle) = self.index.by_id(order.id) else {
                        return Err(format!("order {} on book but not indexed", order.id));
                    };
                    if handle.key != *key || handle.side != side || &handle.instrument != book.key() {
                        return Err(format!("index entry of {} points elsewhere", order.id));
                    }
                    if order.source_remaining.is_sign_negative()
                        || order.source_remaining.is_zero()
                        || order.source_remaining + order.source_filled != order.source_amount
                    {
                        return Err(format!("order {} has inconsistent quantities", order.id));
                    }
                }
            }
        }
        if on_books != self.index.len() {
            return Err(format!("{} orders on books, {} indexed", on_books, self.index.len()));
        }
        Ok(())
    }
}
