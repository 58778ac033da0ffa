//! Session bus connectivity.
//!
//! [`BusConnector`] holds at most one live connection. It starts either
//! [`ConnectionState::Disconnected`] (and dials on the first
//! [`BusConnector::ensure_connected`]) or already connected to an injected
//! handle. Once connected it never re-dials and never probes the connection;
//! a dead connection shows up as a [`BusError::Send`] from the next emit.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::signal::BusSignal;

/// Errors talking to the message bus.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// Opening the session bus connection failed.
    #[error("could not fetch session bus: {0}")]
    Connect(#[source] zbus::Error),

    /// The signal could not be emitted. Carries the underlying message as-is.
    #[error("{0}")]
    Send(String),
}

/// Something that can put a [`BusSignal`] on the bus.
#[async_trait]
pub trait SignalSink: Send + Sync {
    async fn emit(&self, signal: &BusSignal<'_>) -> Result<(), BusError>;
}

/// Opens new bus connections.
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self) -> Result<Arc<dyn SignalSink>, BusError>;
}

/// Dials the user's session bus.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionBus;

#[async_trait]
impl Dialer for SessionBus {
    async fn dial(&self) -> Result<Arc<dyn SignalSink>, BusError> {
        let conn = zbus::Connection::session()
            .await
            .map_err(BusError::Connect)?;
        info!(unique_name = ?conn.unique_name(), "Connected to session bus");
        Ok(Arc::new(ZbusSink::new(conn)))
    }
}

/// [`SignalSink`] backed by a zbus connection.
#[derive(Debug, Clone)]
pub struct ZbusSink {
    conn: zbus::Connection,
}

impl ZbusSink {
    pub const fn new(conn: zbus::Connection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl SignalSink for ZbusSink {
    async fn emit(&self, signal: &BusSignal<'_>) -> Result<(), BusError> {
        // zbus derives the header signature from the body type.
        self.conn
            .emit_signal(
                Some(signal.destination()),
                signal.path(),
                signal.interface(),
                signal.member(),
                &signal.body(),
            )
            .await
            .map_err(|e| BusError::Send(e.to_string()))
    }
}

/// Lifecycle of the single bus connection.
#[derive(Clone)]
pub enum ConnectionState {
    Disconnected,
    Connected(Arc<dyn SignalSink>),
}

impl fmt::Debug for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("Disconnected"),
            Self::Connected(_) => f.write_str("Connected"),
        }
    }
}

/// Owns the process's bus connection.
pub struct BusConnector {
    dialer: Box<dyn Dialer>,
    state: ConnectionState,
}

impl BusConnector {
    /// A disconnected connector that will dial with `dialer`.
    pub fn new(dialer: impl Dialer + 'static) -> Self {
        Self {
            dialer: Box::new(dialer),
            state: ConnectionState::Disconnected,
        }
    }

    /// A disconnected connector for the session bus.
    pub fn session() -> Self {
        Self::new(SessionBus)
    }

    /// A connector that is already connected to `sink`.
    pub fn connected(sink: Arc<dyn SignalSink>) -> Self {
        Self {
            dialer: Box::new(SessionBus),
            state: ConnectionState::Connected(sink),
        }
    }

    pub const fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Return the live connection, dialing first if there is none yet.
    ///
    /// A failed dial leaves the connector disconnected; it is not retried here.
    pub async fn ensure_connected(&mut self) -> Result<Arc<dyn SignalSink>, BusError> {
        if let ConnectionState::Connected(sink) = &self.state {
            return Ok(Arc::clone(sink));
        }

        debug!("Dialing message bus");
        let sink = self.dialer.dial().await?;
        self.state = ConnectionState::Connected(Arc::clone(&sink));
        Ok(sink)
    }
}

impl fmt::Debug for BusConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusConnector")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct NullSink;

    #[async_trait]
    impl SignalSink for NullSink {
        async fn emit(&self, _signal: &BusSignal<'_>) -> Result<(), BusError> {
            Ok(())
        }
    }

    /// Counts dials; fails while `failures` is non-zero.
    #[derive(Clone, Default)]
    struct CountingDialer {
        dials: Arc<AtomicUsize>,
        failures: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Dialer for CountingDialer {
        async fn dial(&self) -> Result<Arc<dyn SignalSink>, BusError> {
            self.dials.fetch_add(1, Ordering::SeqCst);
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(BusError::Connect(zbus::Error::Failure(
                    "no session bus".into(),
                )));
            }
            Ok(Arc::new(NullSink))
        }
    }

    #[tokio::test]
    async fn second_call_reuses_connection() {
        let dialer = CountingDialer::default();
        let mut connector = BusConnector::new(dialer.clone());
        assert!(matches!(connector.state(), ConnectionState::Disconnected));

        let first = connector.ensure_connected().await.unwrap();
        let second = connector.ensure_connected().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(dialer.dials.load(Ordering::SeqCst), 1);
        assert!(matches!(connector.state(), ConnectionState::Connected(_)));
    }

    #[tokio::test]
    async fn failed_dial_stays_disconnected() {
        let dialer = CountingDialer::default();
        dialer.failures.store(1, Ordering::SeqCst);
        let mut connector = BusConnector::new(dialer.clone());

        let err = connector.ensure_connected().await.err().expect("dial should fail");
        assert!(err.to_string().starts_with("could not fetch session bus"));
        assert!(matches!(connector.state(), ConnectionState::Disconnected));
        assert_eq!(dialer.dials.load(Ordering::SeqCst), 1);

        // The caller may retry; the connector does not do so on its own.
        connector.ensure_connected().await.unwrap();
        assert_eq!(dialer.dials.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn injected_connection_never_dials() {
        let sink: Arc<dyn SignalSink> = Arc::new(NullSink);
        let mut connector = BusConnector::connected(Arc::clone(&sink));

        let got = connector.ensure_connected().await.unwrap();
        assert!(Arc::ptr_eq(&got, &sink));
    }

    #[test]
    fn send_error_displays_underlying_message() {
        assert_eq!(BusError::Send("no reply".into()).to_string(), "no reply");
    }
}
