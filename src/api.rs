// 14.0 api.rs: serializable command and query surface. commands arrive from the
// ordered log as EngineCommand, queries as EngineQuery, and every answer is an
// ApiResponse. errors carry the stable numeric codes submitters match on.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::bank::{BalanceGateway, BankError};
use crate::book::PriceLevel;
use crate::engine::{BookSummary, CancelResult, Engine, EngineError, InstrumentSummary, OrderRequest, OrderResult};
use crate::order::{Order, OrderType, TimeInForce};
use crate::types::{AccountId, ClientOrderId, OrderId};

// accepts any casing, "fillOrKill" and "FILLORKILL" alike
fn time_in_force_from_str<'de, D>(deserializer: D) -> Result<TimeInForce, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    text.parse().map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineCommand {
    PlaceLimit {
        owner: AccountId,
        client_order_id: ClientOrderId,
        source: String,
        source_amount: Decimal,
        destination: String,
        destination_amount: Decimal,
        #[serde(default, deserialize_with = "time_in_force_from_str")]
        time_in_force: TimeInForce,
    },
    PlaceMarket {
        owner: AccountId,
        client_order_id: ClientOrderId,
        source: String,
        source_amount: Decimal,
        destination: String,
        destination_amount: Decimal,
        #[serde(default, deserialize_with = "time_in_force_from_str")]
        time_in_force: TimeInForce,
    },
    Cancel {
        owner: AccountId,
        client_order_id: ClientOrderId,
    },
    CancelReplace {
        owner: AccountId,
        prior_client_order_id: ClientOrderId,
        client_order_id: ClientOrderId,
        order_type: OrderType,
        source: String,
        source_amount: Decimal,
        destination: String,
        destination_amount: Decimal,
        #[serde(default, deserialize_with = "time_in_force_from_str")]
        time_in_force: TimeInForce,
    },
}

impl EngineCommand {
    pub fn owner(&self) -> AccountId {
        match self {
            EngineCommand::PlaceLimit { owner, .. }
            | EngineCommand::PlaceMarket { owner, .. }
            | EngineCommand::Cancel { owner, .. }
            | EngineCommand::CancelReplace { owner, .. } => *owner,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineQuery {
    Instruments,
    BestOfBook { source: String, destination: String },
    Depth { source: String, destination: String, max_levels: usize },
    InstrumentOrders { source: String, destination: String },
    Order { order_id: OrderId },
    OrderByClientId { owner: AccountId, client_order_id: ClientOrderId },
    AccountOrders { owner: AccountId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ApiResponse {
    Order(OrderResult),
    Cancelled(CancelResult),
    Instruments(Vec<InstrumentSummary>),
    BookSummary(BookSummary),
    Depth(Vec<PriceLevel>),
    Orders(Vec<Order>),
    OrderDetail(Option<Order>),
    Error(ApiError),
}

impl ApiResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, ApiResponse::Error(_))
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            ApiResponse::Error(err) => Some(err.code),
            _ => None,
        }
    }
}

/// Numeric codes are part of the wire format and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    InsufficientBalance = 1,
    NonUniqueClientOrderId = 2,
    ClientOrderIdNotFound = 3,
    OrderInstrumentChanged = 4,
    InvalidClientOrderId = 5,
    InvalidInstrument = 6,
    InvalidOrder = 7,
    Internal = 8,
}

impl ErrorCode {
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&EngineError> for ErrorCode {
    fn from(err: &EngineError) -> Self {
        match err {
            EngineError::InsufficientBalance { .. } => ErrorCode::InsufficientBalance,
            EngineError::Bank(BankError::InsufficientBalance { .. }) => ErrorCode::InsufficientBalance,
            EngineError::NonUniqueClientOrderId(..) => ErrorCode::NonUniqueClientOrderId,
            EngineError::ClientOrderIdNotFound(..) | EngineError::OrderNotFound(_) => {
                ErrorCode::ClientOrderIdNotFound
            }
            EngineError::OrderInstrumentChanged { .. } => ErrorCode::OrderInstrumentChanged,
            EngineError::InvalidClientOrderId(_) => ErrorCode::InvalidClientOrderId,
            EngineError::Instrument(_) => ErrorCode::InvalidInstrument,
            EngineError::InvalidOrder(_) | EngineError::Overflow(_) => ErrorCode::InvalidOrder,
            EngineError::Bank(_) => ErrorCode::Internal,
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self {
            code: ErrorCode::from(&err),
            message: err.to_string(),
        }
    }
}

fn respond<T>(result: Result<T, EngineError>, wrap: impl FnOnce(T) -> ApiResponse) -> ApiResponse {
    match result {
        Ok(value) => wrap(value),
        Err(err) => ApiResponse::Error(err.into()),
    }
}

impl<B: BalanceGateway> Engine<B> {
    /// Applies one command from the log.
    pub fn apply(&mut self, command: EngineCommand) -> ApiResponse {
        match command {
            EngineCommand::PlaceLimit {
                owner,
                client_order_id,
                source,
                source_amount,
                destination,
                destination_amount,
                time_in_force,
            } => {
                let request = OrderRequest::limit(
                    owner,
                    client_order_id,
                    source_amount,
                    &source,
                    destination_amount,
                    &destination,
                )
                .with_time_in_force(time_in_force);
                respond(self.place_order(request), ApiResponse::Order)
            }
            EngineCommand::PlaceMarket {
                owner,
                client_order_id,
                source,
                source_amount,
                destination,
                destination_amount,
                time_in_force,
            } => {
                let request = OrderRequest::market(
                    owner,
                    client_order_id,
                    source_amount,
                    &source,
                    destination_amount,
                    &destination,
                )
                .with_time_in_force(time_in_force);
                respond(self.place_order(request), ApiResponse::Order)
            }
            EngineCommand::Cancel { owner, client_order_id } => {
                respond(self.cancel_order(owner, &client_order_id), ApiResponse::Cancelled)
            }
            EngineCommand::CancelReplace {
                owner,
                prior_client_order_id,
                client_order_id,
                order_type,
                source,
                source_amount,
                destination,
                destination_amount,
                time_in_force,
            } => {
                let request = OrderRequest {
                    owner,
                    client_order_id,
                    source,
                    destination,
                    order_type,
                    time_in_force,
                    source_amount,
                    destination_amount,
                };
                respond(
                    self.cancel_replace_order(&prior_client_order_id, request),
                    ApiResponse::Order,
                )
            }
        }
    }

    /// Answers a read-only query.
    pub fn query(&self, query: &EngineQuery) -> ApiResponse {
        let owned = |orders: Vec<&Order>| ApiResponse::Orders(orders.into_iter().cloned().collect());
        match query {
            EngineQuery::Instruments => ApiResponse::Instruments(self.instruments()),
            EngineQuery::BestOfBook { source, destination } => {
                respond(self.best_of_book(source, destination), ApiResponse::BookSummary)
            }
            EngineQuery::Depth {
                source,
                destination,
                max_levels,
            } => respond(self.depth(source, destination, *max_levels), ApiResponse::Depth),
            EngineQuery::InstrumentOrders { source, destination } => {
                respond(self.instrument_orders(source, destination), owned)
            }
            EngineQuery::Order { order_id } => ApiResponse::OrderDetail(self.order(*order_id).cloned()),
            EngineQuery::OrderByClientId { owner, client_order_id } => {
                ApiResponse::OrderDetail(self.order_by_client_id(*owner, client_order_id).cloned())
            }
            EngineQuery::AccountOrders { owner } => owned(self.account_orders(*owner)),
        }
    }
}
