// 8.0.2: result types and errors for engine operations.

use crate::bank::BankError;
use crate::book::{MarketData, PriceLevel};
use crate::instrument::{Instrument, InstrumentError};
use crate::matching::MatchOverflow;
use crate::order::{Fill, Order, OrderStatus};
use crate::types::{AccountId, ClientOrderId, OrderId, Price};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fill report for a place or cancel-replace command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResult {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub source_filled: Decimal,
    pub destination_filled: Decimal,
    pub source_remaining: Decimal,
    /// Destination per source over all fills of this command.
    pub average_price: Option<Price>,
    pub is_posted: bool,
    pub fills: Vec<Fill>,
}

impl OrderResult {
    pub fn is_killed(&self) -> bool {
        self.status == OrderStatus::Killed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelResult {
    pub order: Order,
    pub source_released: Decimal,
}

/// One direction of a pair as seen by the query surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentSummary {
    pub instrument: Instrument,
    pub best_price: Option<Price>,
    pub last_trade: Option<MarketData>,
    pub resting_orders: usize,
}

/// Best level on both directions of a pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSummary {
    pub instrument: Instrument,
    /// Best order offering the instrument's source.
    pub best_offer: Option<PriceLevel>,
    /// Best order offering the instrument's destination, priced in its own direction.
    pub best_counter_offer: Option<PriceLevel>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Instrument(#[from] InstrumentError),

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    #[error("Specified client order ID is not valid: '{0}'")]
    InvalidClientOrderId(ClientOrderId),

    #[error("Account {0} already has an active order with client order id: {1}")]
    NonUniqueClientOrderId(AccountId, ClientOrderId),

    #[error("Account {0} does not have an active order with client order id: {1}")]
    ClientOrderIdNotFound(AccountId, ClientOrderId),

    #[error("Instrument cannot be changed when using CancelReplace: {prior} != {requested}")]
    OrderInstrumentChanged { prior: Instrument, requested: Instrument },

    #[error("Account {account_id} has insufficient balance to execute trade: {available} < {required}")]
    InsufficientBalance {
        account_id: AccountId,
        required: Decimal,
        available: Decimal,
    },

    #[error("Order {0:?} not found")]
    OrderNotFound(OrderId),

    #[error("Balance gateway error: {0}")]
    Bank(#[from] BankError),

    #[error(transparent)]
    Overflow(#[from] MatchOverflow),
}
