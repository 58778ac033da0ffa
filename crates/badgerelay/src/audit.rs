//! Per-attempt log records.
//!
//! The relay reports every signal-send attempt through an injected
//! [`RelayLog`] instead of global logging state.

use std::fmt;

use tracing::{info, warn};

use crate::bus::BusError;

/// Outcome of one send attempt. Displays as `OK` or `err:<message>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    Ok,
    Err(String),
}

impl AttemptResult {
    pub fn from_send(result: &Result<(), BusError>) -> Self {
        match result {
            Ok(()) => Self::Ok,
            Err(e) => Self::Err(e.to_string()),
        }
    }

    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for AttemptResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("OK"),
            Self::Err(message) => write!(f, "err:{message}"),
        }
    }
}

/// One structured log entry: the request fields plus the send outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalAttempt<'a> {
    pub window_id: &'a str,
    pub label: &'a str,
    pub color: &'a str,
    pub result: AttemptResult,
}

impl SignalAttempt<'_> {
    /// Key/value view of the entry, in emission order.
    pub fn fields(&self) -> [(&'static str, String); 4] {
        [
            ("windowID", self.window_id.to_string()),
            ("label", self.label.to_string()),
            ("color", self.color.to_string()),
            ("result", self.result.to_string()),
        ]
    }
}

/// Sink for [`SignalAttempt`] records.
pub trait RelayLog: Send + Sync {
    fn record(&self, attempt: &SignalAttempt<'_>);
}

/// Discards every record. Used when no log sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopLog;

impl RelayLog for NopLog {
    fn record(&self, _attempt: &SignalAttempt<'_>) {}
}

/// Forwards records to `tracing` as one event each.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl RelayLog for TracingLog {
    fn record(&self, attempt: &SignalAttempt<'_>) {
        if attempt.result.is_ok() {
            info!(
                windowID = attempt.window_id,
                label = attempt.label,
                color = attempt.color,
                result = %attempt.result,
                "Relayed notification"
            );
        } else {
            warn!(
                windowID = attempt.window_id,
                label = attempt.label,
                color = attempt.color,
                result = %attempt.result,
                "Failed to relay notification"
            );
        }
    }
}
