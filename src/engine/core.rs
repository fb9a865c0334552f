// 8.0 engine/core.rs: main engine. holds the instrument registry (and through it every
// book), the order index, the balance gateway and the event log.

use super::config::{EngineConfig, EngineConfigError};
use super::results::EngineError;
use crate::bank::{BalanceGateway, InMemoryBank};
use crate::events::{Event, EventId, EventPayload};
use crate::index::OrderIndex;
use crate::instrument::{InstrumentError, InstrumentRegistry};
use crate::types::{Denom, Timestamp};
use std::fmt;
use tracing::{debug, error};

/** 8.1: main engine struct. all matching state lives here and is only mutated by
 * the engine's own commands, one at a time, in log order. */
#[derive(Debug)]
pub struct Engine<B = InMemoryBank> {
    pub(super) config: EngineConfig,
    pub(super) registry: InstrumentRegistry,
    pub(super) index: OrderIndex,
    pub(super) bank: B,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) next_order_id: u64,
    pub(super) current_time: Timestamp,
}

impl Engine<InMemoryBank> {
    pub fn new(config: EngineConfig) -> Result<Self, EngineConfigError> {
        Self::with_gateway(config, InMemoryBank::new())
    }
}

impl<B: BalanceGateway> Engine<B> {
    /// Rejects configs whose amount limit would let price comparisons overflow.
    pub fn with_gateway(config: EngineConfig, bank: B) -> Result<Self, EngineConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            registry: InstrumentRegistry::new(),
            index: OrderIndex::new(),
            bank,
            events: Vec::new(),
            next_event_id: 1,
            next_order_id: 1,
            current_time: Timestamp::from_millis(0),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // block time of the command being applied. stamped on orders and events.
    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = Timestamp::from_millis(self.current_time.as_millis().saturating_add(millis));
    }

    /// Makes a denomination tradable. Returns the normalised denomination.
    pub fn register_denom(&mut self, denom: &str) -> Result<Denom, EngineError> {
        let parsed = Denom::new(denom).ok_or_else(|| InstrumentError::InvalidInstrument {
            source_denom: denom.to_string(),
            destination_denom: String::new(),
        })?;
        if self.registry.register_denom(parsed.clone()) {
            debug!(denom = %parsed, "registered denomination");
        }
        Ok(parsed)
    }

    pub fn denoms(&self) -> impl Iterator<Item = &Denom> {
        self.registry.denoms()
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    // the ledger itself is external; funding accounts goes straight to it
    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }

    /// The id the next accepted order will get.
    pub fn peek_next_order_id(&self) -> u64 {
        self.next_order_id
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;

        if self.config.log_events {
            debug!(event_id = event.id.0, payload = ?event.payload, "event");
        }

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }
}

/// Book, index and balances disagree. Continuing would let this node diverge from
/// the others, so it stops here.
#[cold]
pub(super) fn halt(what: impl fmt::Display) -> ! {
    error!(%what, "matching state invariant violated");
    panic!("matching state invariant violated: {what}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn oversized_amount_limit_is_refused() {
        let config = EngineConfig {
            max_order_amount: crate::types::max_amount() * dec!(1000000),
            ..EngineConfig::default()
        };
        let result = Engine::new(config);
        assert!(matches!(
            result,
            Err(EngineConfigError::OrderAmountOutOfRange { .. })
        ));

        let result = Engine::with_gateway(
            EngineConfig {
                max_events: 0,
                ..EngineConfig::default()
            },
            InMemoryBank::new(),
        );
        assert!(matches!(result, Err(EngineConfigError::NoEventCapacity)));
    }

    #[test]
    fn clock_saturates() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        engine.advance_time(1_000);
        assert_eq!(engine.time(), Timestamp::from_millis(1_000));

        engine.set_time(Timestamp::from_millis(i64::MAX - 5));
        engine.advance_time(10);
        assert_eq!(engine.time(), Timestamp::from_millis(i64::MAX));
    }
}
