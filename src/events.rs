// 11.0: every accepted command produces events. used for audit trails, fill reports to
// submitters and notifying external systems. the EventPayload enum lists all event types.
// rejected commands produce none.

use crate::instrument::Instrument;
use crate::order::{OrderStatus, OrderType, TimeInForce};
use crate::types::{AccountId, ClientOrderId, OrderId, Price, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    OrderAccepted(OrderAcceptedEvent),
    Fill(FillEvent),
    OrderCancelled(OrderCancelledEvent),
    OrderKilled(OrderKilledEvent),
    OrderReplaced(OrderReplacedEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAcceptedEvent {
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub client_order_id: ClientOrderId,
    pub instrument: Instrument,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    pub source_amount: Decimal,
    pub destination_amount: Decimal,
}

// one per order per match: a match produces a taker and a maker fill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillEvent {
    pub instrument: Instrument,
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub counterparty: AccountId,
    pub source_amount: Decimal,
    pub destination_amount: Decimal,
    pub price: Price,
    pub source_remaining: Decimal,
    pub status: OrderStatus,
    pub is_maker: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelledEvent {
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub client_order_id: ClientOrderId,
    pub source_released: Decimal,
    pub reason: CancelReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    UserRequested,
    Replaced,
    // immediate-or-cancel or market remainder nobody took
    Unfilled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderKilledEvent {
    pub order_id: OrderId,
    pub account_id: AccountId,
    pub client_order_id: ClientOrderId,
    pub source_amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReplacedEvent {
    pub account_id: AccountId,
    pub prior_order_id: OrderId,
    pub new_order_id: OrderId,
}

impl EventPayload {
    /// Order the event is about. replacements report the new order.
    pub fn order_id(&self) -> OrderId {
        match self {
            EventPayload::OrderAccepted(e) => e.order_id,
            EventPayload::Fill(e) => e.order_id,
            EventPayload::OrderCancelled(e) => e.order_id,
            EventPayload::OrderKilled(e) => e.order_id,
            EventPayload::OrderReplaced(e) => e.new_order_id,
        }
    }
}
