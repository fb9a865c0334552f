//! Engine configuration options.

use crate::types::max_amount;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Engine configuration. Every node must run with the same values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Longest accepted client order id, in characters.
    pub max_client_order_id_len: usize,
    /// Largest source or destination amount on a single order.
    pub max_order_amount: Decimal,
    /// Refuse market orders that would rest on an empty book. When off, the
    /// residual rests at the order's quoted amounts like a limit order.
    pub reject_market_gtc_on_empty_book: bool,
    /// Log every event at debug level.
    pub log_events: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            max_client_order_id_len: 32,
            max_order_amount: max_amount(),
            reject_market_gtc_on_empty_book: true,
            log_events: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineConfigError {
    #[error("max_events must be positive")]
    NoEventCapacity,

    #[error("max_client_order_id_len must be positive")]
    EmptyClientOrderIds,

    #[error("max_order_amount must be a positive whole number no larger than {limit}, got {value}")]
    OrderAmountOutOfRange { value: Decimal, limit: Decimal },
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineConfigError> {
        if self.max_events == 0 {
            return Err(EngineConfigError::NoEventCapacity);
        }
        if self.max_client_order_id_len == 0 {
            return Err(EngineConfigError::EmptyClientOrderIds);
        }
        let limit = max_amount();
        if !crate::types::is_positive_whole(self.max_order_amount) || self.max_order_amount > limit {
            return Err(EngineConfigError::OrderAmountOutOfRange {
                value: self.max_order_amount,
                limit,
            });
        }
        Ok(())
    }
}
