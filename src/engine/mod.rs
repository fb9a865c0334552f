// 8.0: matching engine. validates commands, matches orders against the books,
// settles through the balance gateway and keeps books and index in step.
// deterministic and event-driven with no external I/O.

mod config;
mod core;
mod orders;
mod queries;
mod results;

pub use config::{EngineConfig, EngineConfigError};
pub use self::core::Engine;
pub use orders::OrderRequest;
pub use results::{BookSummary, CancelResult, EngineError, InstrumentSummary, OrderResult};
