//! Order index.
//!
//! Tracks every live order by id and by `(owner, client_order_id)`. Entries are
//! back-references into the books (pair key, side, priority key); the books own the
//! orders. Every book insert/remove is paired with exactly one index insert/remove by
//! the engine.

use crate::instrument::{BookSide, InstrumentKey};
use crate::order::PriorityKey;
use crate::types::{AccountId, ClientOrderId, OrderId};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderHandle {
    pub instrument: InstrumentKey,
    pub side: BookSide,
    pub key: PriorityKey,
    pub owner: AccountId,
    pub client_order_id: ClientOrderId,
}

impl OrderHandle {
    pub fn order_id(&self) -> OrderId {
        self.key.order_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error("Order {0:?} is already indexed")]
    DuplicateOrderId(OrderId),

    #[error("Account {0} already has a live order with client order id {1}")]
    DuplicateClientOrderId(AccountId, ClientOrderId),
}

#[derive(Debug, Clone, Default)]
pub struct OrderIndex {
    by_id: BTreeMap<OrderId, OrderHandle>,
    by_client: BTreeMap<(AccountId, ClientOrderId), OrderId>,
}

impl OrderIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: OrderHandle) -> Result<(), IndexError> {
        let order_id = handle.order_id();
        if self.by_id.contains_key(&order_id) {
            return Err(IndexError::DuplicateOrderId(order_id));
        }
        let client_key = (handle.owner, handle.client_order_id.clone());
        if self.by_client.contains_key(&client_key) {
            return Err(IndexError::DuplicateClientOrderId(client_key.0, client_key.1));
        }

        self.by_client.insert(client_key, order_id);
        self.by_id.insert(order_id, handle);
        Ok(())
    }

    pub fn remove(&mut self, order_id: OrderId) -> Option<OrderHandle> {
        let handle = self.by_id.remove(&order_id)?;
        self.by_client
            .remove(&(handle.owner, handle.client_order_id.clone()));
        Some(handle)
    }

    pub fn by_id(&self, order_id: OrderId) -> Option<&OrderHandle> {
        self.by_id.get(&order_id)
    }

    pub fn by_client_order_id(&self, owner: AccountId, client_order_id: &ClientOrderId) -> Option<&OrderHandle> {
        self.by_client
            .get(&(owner, client_order_id.clone()))
            .and_then(|id| self.by_id.get(id))
    }

    pub fn contains_client_order_id(&self, owner: AccountId, client_order_id: &ClientOrderId) -> bool {
        self.by_client.contains_key(&(owner, client_order_id.clone()))
    }

    /// Live orders of one account, lowest id first.
    pub fn owner_orders(&self, owner: AccountId) -> Vec<&OrderHandle> {
        let mut ids: Vec<OrderId> = self
            .by_client
            .range((owner, ClientOrderId::new(""))..)
            .take_while(|((account, _), _)| *account == owner)
            .map(|(_, id)| *id)
            .collect();
        ids.sort();
        ids.iter().filter_map(|id| self.by_id.get(id)).collect()
    }

    pub fn handles(&self) -> impl Iterator<Item = &OrderHandle> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
