// fx-market-core: order matching for a multi-currency token ledger.
// every pair of registered denominations is a market; orders offer one token for
// another and match at the resting order's price. commands apply one at a time and
// the outcome is identical on every node: no I/O, no clocks, no hashing order.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: AccountId, OrderId, Denom, ClientOrderId, Price
//   2.x  order.rs: orders, time in force, priority keys, fills
//   3.x  instrument.rs: instruments and the instrument registry
//   4.x  book.rs: per-pair order book, depth and last trade
//   5.x  matching.rs: read-only match planning
//   6.x  index.rs: live orders by id and by client order id
//   7.x  config.rs: market setup, TOML loading, env presets
//   8.x  engine/: place, cancel, cancel-replace, queries
//   9.1  settlement.rs: settlement batches
//   9.2  bank.rs: balance gateway + in-memory ledger
//   11.x events.rs: state transition events for audit
//   14.x api.rs: serializable commands, queries, error codes

// core matching modules
pub mod book;
pub mod engine;
pub mod events;
pub mod index;
pub mod instrument;
pub mod matching;
pub mod order;
pub mod types;

// integration modules
pub mod api;
pub mod bank;
pub mod config;
pub mod settlement;

// re exports for convenience
pub use book::*;
pub use engine::*;
pub use events::*;
pub use instrument::*;
pub use order::*;
pub use types::*;
pub use api::{ApiError, ApiResponse, EngineCommand, EngineQuery, ErrorCode};
pub use bank::{Balance, BalanceGateway, BankError, InMemoryBank};
pub use config::{ConfigError, Environment, MarketConfig};
pub use matching::{plan_match, MatchPlan, MatchStep};
pub use settlement::{SettlementBatch, SettlementInstruction};
