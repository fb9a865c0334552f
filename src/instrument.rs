//! Instruments and the instrument registry.
//!
//! An instrument is a trading direction `source -> destination`. Both directions of a
//! currency pair share one order book, stored under the canonical (sorted) pair. The
//! registry is the only place books are created, lazily, the first time an order
//! rests on a pair.

use crate::book::OrderBook;
use crate::types::Denom;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::info;

/// A trading direction: orders on it offer `source` in exchange for `destination`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub source: Denom,
    pub destination: Denom,
}

impl Instrument {
    /// `None` when both sides are the same denomination.
    #[must_use]
    pub fn new(source: Denom, destination: Denom) -> Option<Self> {
        if source == destination {
            None
        } else {
            Some(Self { source, destination })
        }
    }

    pub fn reversed(&self) -> Self {
        Self {
            source: self.destination.clone(),
            destination: self.source.clone(),
        }
    }

    pub fn key(&self) -> InstrumentKey {
        if self.source < self.destination {
            InstrumentKey {
                first: self.source.clone(),
                second: self.destination.clone(),
            }
        } else {
            InstrumentKey {
                first: self.destination.clone(),
                second: self.source.clone(),
            }
        }
    }

    /// Which half of the shared book holds orders in this direction.
    pub fn side(&self) -> BookSide {
        if self.source < self.destination {
            BookSide::Forward
        } else {
            BookSide::Reverse
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source, self.destination)
    }
}

/// Canonical storage key of a pair: `first < second`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstrumentKey {
    pub first: Denom,
    pub second: Denom,
}

impl InstrumentKey {
    pub fn instrument(&self, side: BookSide) -> Instrument {
        match side {
            BookSide::Forward => Instrument {
                source: self.first.clone(),
                destination: self.second.clone(),
            },
            BookSide::Reverse => Instrument {
                source: self.second.clone(),
                destination: self.first.clone(),
            },
        }
    }
}

/// Forward holds orders offering `first` for `second`, Reverse the opposite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BookSide {
    Forward,
    Reverse,
}

impl BookSide {
    pub fn opposite(&self) -> Self {
        match self {
            BookSide::Forward => BookSide::Reverse,
            BookSide::Reverse => BookSide::Forward,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InstrumentError {
    // thiserror reserves a field called `source`
    #[error("'{source_denom}/{destination_denom}' is not a valid instrument")]
    InvalidInstrument {
        source_denom: String,
        destination_denom: String,
    },

    #[error("No order book for instrument {0}")]
    NotFound(Instrument),
}

#[derive(Debug, Clone, Default)]
pub struct InstrumentRegistry {
    denoms: BTreeSet<Denom>,
    books: BTreeMap<InstrumentKey, OrderBook>,
}

impl InstrumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the denomination was already registered.
    pub fn register_denom(&mut self, denom: Denom) -> bool {
        self.denoms.insert(denom)
    }

    pub fn is_registered(&self, denom: &Denom) -> bool {
        self.denoms.contains(denom)
    }

    pub fn denoms(&self) -> impl Iterator<Item = &Denom> {
        self.denoms.iter()
    }

    /// Parses and checks a direction: both denominations registered and distinct.
    pub fn validate(&self, source: &str, destination: &str) -> Result<Instrument, InstrumentError> {
        let invalid = || InstrumentError::InvalidInstrument {
            source_denom: source.to_string(),
            destination_denom: destination.to_string(),
        };

        let source_denom = Denom::new(source).ok_or_else(invalid)?;
        let destination_denom = Denom::new(destination).ok_or_else(invalid)?;
        if !self.is_registered(&source_denom) || !self.is_registered(&destination_denom) {
            return Err(invalid());
        }
        Instrument::new(source_denom, destination_denom).ok_or_else(invalid)
    }

    pub fn resolve(&self, instrument: &Instrument) -> Result<&OrderBook, InstrumentError> {
        self.books
            .get(&instrument.key())
            .ok_or_else(|| InstrumentError::NotFound(instrument.clone()))
    }

    pub fn resolve_key_mut(&mut self, key: &InstrumentKey) -> Option<&mut OrderBook> {
        self.books.get_mut(key)
    }

    pub fn resolve_key(&self, key: &InstrumentKey) -> Option<&OrderBook> {
        self.books.get(key)
    }

    /// Returns the book for the instrument, creating an empty one on first use.
    pub fn ensure(&mut self, instrument: &Instrument) -> Result<&mut OrderBook, InstrumentError> {
        if instrument.source == instrument.destination
            || !self.is_registered(&instrument.source)
            || !self.is_registered(&instrument.destination)
        {
            return Err(InstrumentError::InvalidInstrument {
                source_denom: instrument.source.to_string(),
                destination_denom: instrument.destination.to_string(),
            });
        }

        let key = instrument.key();
        let book = self.books.entry(key.clone()).or_insert_with(|| {
            info!(first = %key.first, second = %key.second, "created order book");
            OrderBook::new(key)
        });
        Ok(book)
    }

    /// Every ordered pair of distinct registered denominations.
    pub fn pairs(&self) -> Vec<Instrument> {
        let mut pairs = Vec::new();
        for source in &self.denoms {
            for destination in &self.denoms {
                if source != destination {
                    pairs.push(Instrument {
                        source: source.clone(),
                        destination: destination.clone(),
                    });
                }
            }
        }
        pairs
    }

    pub fn books(&self) -> impl Iterator<Item = &OrderBook> {
        self.books.values()
    }

    pub fn book_count(&self) -> usize {
        self.books.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> InstrumentRegistry {
        let mut registry = InstrumentRegistry::new();
        for d in ["eur", "usd", "chf"] {
            registry.register_denom(Denom::new(d).unwrap());
        }
        registry
    }

    #[test]
    fn both_directions_share_a_key() {
        let registry = registry();
        let eur_usd = registry.validate("eur", "usd").unwrap();
        let usd_eur = registry.validate("usd", "eur").unwrap();

        assert_eq!(eur_usd.key(), usd_eur.key());
        assert_eq!(eur_usd.side(), BookSide::Forward);
        assert_eq!(usd_eur.side(), BookSide::Reverse);
        assert_eq!(eur_usd.reversed(), usd_eur);
        assert_eq!(eur_usd.key().instrument(BookSide::Reverse), usd_eur);
    }

    #[test]
    fn rejects_same_or_unknown_denoms() {
        let registry = registry();
        assert!(matches!(
            registry.validate("eur", "eur"),
            Err(InstrumentError::InvalidInstrument { .. })
        ));
        assert!(matches!(
            registry.validate("eur", "jpy"),
            Err(InstrumentError::InvalidInstrument { .. })
        ));
        assert!(registry.validate("EUR", "usd").is_ok());
    }

    #[test]
    fn books_are_created_lazily() {
        let mut registry = registry();
        let instrument = registry.validate("eur", "usd").unwrap();

        assert!(matches!(registry.resolve(&instrument), Err(InstrumentError::NotFound(_))));
        assert_eq!(registry.book_count(), 0);

        registry.ensure(&instrument).unwrap();
        registry.ensure(&instrument.reversed()).unwrap();
        assert_eq!(registry.book_count(), 1);
        assert!(registry.resolve(&instrument).is_ok());
    }

    #[test]
    fn lists_all_ordered_pairs() {
        let registry = registry();
        assert_eq!(registry.pairs().len(), 6);
    }
}
