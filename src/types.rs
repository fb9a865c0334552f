// 1.0: all the primitives live here. nothing in the engine works without these types.
// IDs, denominations, client order ids, prices, timestamps and the integer amount helpers.
// each is a newtype so the compiler catches type mixups.

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "acc{}", self.0)
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// 1.1: token denomination, e.g. "eur", "usd", "chf". stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Denom(String);

impl Denom {
    pub const MIN_LEN: usize = 2;
    pub const MAX_LEN: usize = 16;

    /// Parses a denomination. Accepts 2..=16 ASCII alphanumerics starting with a letter,
    /// case-insensitively.
    #[must_use]
    pub fn new(text: &str) -> Option<Self> {
        let len = text.len();
        if !(Self::MIN_LEN..=Self::MAX_LEN).contains(&len) {
            return None;
        }
        let mut chars = text.chars();
        if !chars.next().is_some_and(|c| c.is_ascii_alphabetic()) {
            return None;
        }
        if !chars.all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(Self(text.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Denom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// 1.2: caller-chosen order reference, unique per owner among live orders.
// shape is checked by the engine against the configured length limit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientOrderId(String);

impl ClientOrderId {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_well_formed(&self, max_len: usize) -> bool {
        !self.0.is_empty()
            && self.0.chars().count() <= max_len
            && !self.0.chars().any(char::is_whitespace)
    }
}

impl From<&str> for ClientOrderId {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for ClientOrderId {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// 1.3: price as destination units per source unit. for reporting only:
// crossing and book ordering use exact cross-multiplication instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn new_unchecked(value: Decimal) -> Self {
        debug_assert!(value > Decimal::ZERO);
        Self(value)
    }

    /// destination / source, `None` when either side is not positive.
    pub fn from_amounts(source: Decimal, destination: Decimal) -> Option<Self> {
        if source <= Decimal::ZERO || destination <= Decimal::ZERO {
            return None;
        }
        destination.checked_div(source).and_then(Self::new)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

// 1.4: millisecond timestamp. the engine only ever sees the time it is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    /// Calendar form for reports. `None` outside chrono's representable range.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(at) => write!(f, "{}", at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => write!(f, "{}ms", self.0),
        }
    }
}

// 1.5: amounts are whole units of the smallest denomination.

/// Largest amount accepted on an order. keeps every cross-multiplication of two
/// amounts inside decimal range.
pub fn max_amount() -> Decimal {
    Decimal::from(100_000_000_000_000u64)
}

/// True for strictly positive whole numbers.
pub fn is_positive_whole(amount: Decimal) -> bool {
    amount > Decimal::ZERO && amount.fract().is_zero()
}

/// floor(a * b / c). `None` on overflow or a zero divisor.
pub fn mul_div_floor(a: Decimal, b: Decimal, c: Decimal) -> Option<Decimal> {
    if c.is_zero() {
        return None;
    }
    let product = a.checked_mul(b)?;
    let quotient = product.checked_div(c)?.floor();
    // decimal division keeps 28 significant digits; nudge the result if it
    // landed one unit off the exact integer quotient.
    if quotient.checked_mul(c)? > product {
        Some(quotient - Decimal::ONE)
    } else if (quotient + Decimal::ONE).checked_mul(c)? <= product {
        Some(quotient + Decimal::ONE)
    } else {
        Some(quotient)
    }
}

/// ceil(a * b / c). `None` on overflow or a zero divisor.
pub fn mul_div_ceil(a: Decimal, b: Decimal, c: Decimal) -> Option<Decimal> {
    let floor = mul_div_floor(a, b, c)?;
    if floor.checked_mul(c)? == a.checked_mul(b)? {
        Some(floor)
    } else {
        Some(floor + Decimal::ONE)
    }
}
