//! Badge Relay Library
//!
//! Relays HTTP notification requests for dock icons to the session bus:
//! - Validated, immutable relay configuration
//! - Bus connector holding a single session bus connection
//! - Signal construction and per-attempt logging
//! - axum router exposing `POST /{windowID}`

pub mod audit;
pub mod bus;
pub mod config;
pub mod relay;
pub mod routes;
pub mod signal;
pub mod tracing_init;

pub use audit::{RelayLog, SignalAttempt, TracingLog};
pub use bus::{BusConnector, BusError, SignalSink};
pub use config::{ConfigError, RelayConfig};
pub use relay::{RelayService, RequestError};
