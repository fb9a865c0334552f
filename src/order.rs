//! Order types.
//!
//! An order offers `source_amount` of its source denomination for at least
//! `destination_amount` of its destination denomination. Its price is
//! `destination_amount / source_amount`. Quantities are tracked on the source side:
//! `source_remaining + source_filled == source_amount` at all times.

use crate::instrument::Instrument;
use crate::types::{AccountId, ClientOrderId, OrderId, Price, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Order time in force options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good till cancelled. Any unmatched remainder rests on the book.
    #[default]
    GoodTilCancel,
    /// Fill or kill. Fill entirely at placement or leave no trace.
    FillOrKill,
    /// Immediate or cancel. Fill what crosses, release the rest.
    ImmediateOrCancel,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimeInForce::GoodTilCancel => "GoodTilCancel",
            TimeInForce::FillOrKill => "FillOrKill",
            TimeInForce::ImmediateOrCancel => "ImmediateOrCancel",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown time in force '{0}'")]
pub struct ParseTimeInForceError(pub String);

impl FromStr for TimeInForce {
    type Err = ParseTimeInForceError;

    // case-insensitive: "FILLORKILL" and "FillOrKill" are the same policy
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "goodtilcancel" | "gtc" => Ok(TimeInForce::GoodTilCancel),
            "fillorkill" | "fok" => Ok(TimeInForce::FillOrKill),
            "immediateorcancel" | "ioc" => Ok(TimeInForce::ImmediateOrCancel),
            _ => Err(ParseTimeInForceError(s.to_string())),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    /// Crosses only resting orders at or better than its own price.
    Limit,
    /// Crosses the best available price at every step.
    Market,
}

/// Lifecycle state reported back to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Resting,
    PartiallyFilled,
    Filled,
    Cancelled,
    Killed,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Killed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub owner: AccountId,
    pub client_order_id: ClientOrderId,
    pub instrument: Instrument,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    pub source_amount: Decimal,
    pub destination_amount: Decimal,
    pub source_remaining: Decimal,
    pub source_filled: Decimal,
    pub destination_filled: Decimal,
    pub created_at: Timestamp,
}

impl Order {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: OrderId,
        owner: AccountId,
        client_order_id: ClientOrderId,
        instrument: Instrument,
        order_type: OrderType,
        time_in_force: TimeInForce,
        source_amount: Decimal,
        destination_amount: Decimal,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            owner,
            client_order_id,
            instrument,
            order_type,
            time_in_force,
            source_amount,
            destination_amount,
            source_remaining: source_amount,
            source_filled: Decimal::ZERO,
            destination_filled: Decimal::ZERO,
            created_at,
        }
    }

    pub fn price(&self) -> Price {
        Price::new_unchecked(self.destination_amount / self.source_amount)
    }

    pub fn is_filled(&self) -> bool {
        self.source_remaining.is_zero()
    }

    pub fn status(&self) -> OrderStatus {
        if self.is_filled() {
            OrderStatus::Filled
        } else if self.source_filled.is_zero() {
            OrderStatus::Resting
        } else {
            OrderStatus::PartiallyFilled
        }
    }

    /// Records a match: `source` given away, `destination` received.
    pub fn fill(&mut self, source: Decimal, destination: Decimal) {
        debug_assert!(source <= self.source_remaining, "cannot fill more than remaining");
        self.source_remaining -= source;
        self.source_filled += source;
        self.destination_filled += destination;
    }

    /// Average price achieved so far, destination per source.
    pub fn average_price(&self) -> Option<Price> {
        Price::from_amounts(self.source_filled, self.destination_filled)
    }

    pub fn priority_key(&self) -> PriorityKey {
        PriorityKey::new(self.source_amount, self.destination_amount, self.id)
    }
}

/// Book position of a resting order: best price first, then lowest id.
///
/// For resting orders "best" is the lowest asking price `destination / source`.
/// Prices are compared by cross-multiplication so no rounding ever decides priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityKey {
    pub source_amount: Decimal,
    pub destination_amount: Decimal,
    pub order_id: OrderId,
}

impl PriorityKey {
    pub fn new(source_amount: Decimal, destination_amount: Decimal, order_id: OrderId) -> Self {
        Self {
            source_amount,
            destination_amount,
            order_id,
        }
    }

    pub fn cmp_price(&self, other: &Self) -> Ordering {
        // a.dst / a.src vs b.dst / b.src, both denominators positive
        let lhs = self.destination_amount * other.source_amount;
        let rhs = other.destination_amount * self.source_amount;
        lhs.cmp(&rhs)
    }
}

impl PartialOrd for PriorityKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PriorityKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_price(other).then(self.order_id.cmp(&other.order_id))
    }
}

/// One match between an incoming (taker) order and a resting (maker) order.
/// Amounts are from the taker's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub instrument: Instrument,
    pub maker_order_id: OrderId,
    pub maker_account_id: AccountId,
    pub taker_order_id: OrderId,
    pub taker_account_id: AccountId,
    /// Taker source paid to the maker.
    pub source_amount: Decimal,
    /// Maker source received by the taker.
    pub destination_amount: Decimal,
    /// Execution price, taker destination per taker source.
    pub price: Price,
    pub maker_remaining: Decimal,
    pub maker_status: OrderStatus,
}
