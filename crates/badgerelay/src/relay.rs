//! The HTTP -> bus relay service.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::audit::{AttemptResult, NopLog, RelayLog, SignalAttempt};
use crate::bus::{BusConnector, BusError, Dialer, SignalSink};
use crate::config::{ConfigError, RelayConfig, RelayConfigBuilder};
use crate::signal::{BusSignal, NotificationRequest};

/// Why a notification request was not relayed.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The window ID path segment was empty or whitespace.
    #[error("missing window ID")]
    MissingWindowId,

    /// The body was not a valid notification JSON object.
    #[error("malformed body")]
    MalformedBody(#[source] serde_json::Error),

    /// The signal was sent and the bus reported an error.
    #[error("unable to raise signal: {0}")]
    Signal(#[source] BusError),
}

impl RequestError {
    /// Whether the caller's input was at fault (no bus interaction happened).
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingWindowId | Self::MalformedBody(_))
    }
}

/// Relays notification requests to the bus as signals.
pub struct RelayService {
    config: RelayConfig,
    bus: Arc<dyn SignalSink>,
    log: Arc<dyn RelayLog>,
}

impl RelayService {
    pub fn builder() -> RelayServiceBuilder {
        RelayServiceBuilder::default()
    }

    pub const fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// `host:port` the HTTP server should listen on.
    pub fn listen_addr(&self) -> String {
        self.config.listen_addr()
    }

    /// Validate and relay one `POST /{windowID}` request.
    ///
    /// Client errors return before touching the bus and are not logged.
    /// Every send attempt produces exactly one [`SignalAttempt`] record.
    pub async fn handle(&self, window_id: &str, body: &[u8]) -> Result<(), RequestError> {
        let window_id = window_id.trim();
        if window_id.is_empty() {
            return Err(RequestError::MissingWindowId);
        }

        let request = NotificationRequest::from_json(body).map_err(RequestError::MalformedBody)?;

        let result = self.raise_signal(window_id, &request).await;
        self.log.record(&SignalAttempt {
            window_id,
            label: &request.label,
            color: &request.color,
            result: AttemptResult::from_send(&result),
        });

        result.map_err(RequestError::Signal)
    }

    /// Emit the notification signal for `window_id`.
    #[instrument(skip(self, request), fields(member = self.config.bus().member()))]
    pub async fn raise_signal(
        &self,
        window_id: &str,
        request: &NotificationRequest,
    ) -> Result<(), BusError> {
        let signal = BusSignal::new(self.config.bus(), window_id, request);
        debug!(
            destination = signal.destination(),
            path = signal.path(),
            interface = signal.interface(),
            "Emitting signal"
        );
        self.bus.emit(&signal).await
    }
}

impl fmt::Debug for RelayService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Collects relay settings. [`RelayServiceBuilder::build`] applies all of
/// them, then performs exactly one connectivity check.
pub struct RelayServiceBuilder {
    config: RelayConfigBuilder,
    log: Arc<dyn RelayLog>,
    connector: Option<BusConnector>,
}

impl Default for RelayServiceBuilder {
    fn default() -> Self {
        Self {
            config: RelayConfig::builder(),
            log: Arc::new(NopLog),
            connector: None,
        }
    }
}

impl RelayServiceBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config = self.config.host(host);
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config = self.config.port(port);
        self
    }

    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.config = self.config.destination(destination);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.config = self.config.path(path);
        self
    }

    pub fn interface(mut self, interface: impl Into<String>) -> Self {
        self.config = self.config.interface(interface);
        self
    }

    pub fn member(mut self, member: impl Into<String>) -> Self {
        self.config = self.config.member(member);
        self
    }

    pub fn log(mut self, log: impl RelayLog + 'static) -> Self {
        self.log = Arc::new(log);
        self
    }

    /// Use an already-open connection instead of dialing the session bus.
    pub fn connection(mut self, sink: Arc<dyn SignalSink>) -> Self {
        self.connector = Some(BusConnector::connected(sink));
        self
    }

    /// Dial with `dialer` instead of the session bus.
    pub fn dialer(mut self, dialer: impl Dialer + 'static) -> Self {
        self.connector = Some(BusConnector::new(dialer));
        self
    }

    pub async fn build(self) -> Result<RelayService, ConfigError> {
        let config = self.config.build()?;
        let mut connector = self.connector.unwrap_or_else(BusConnector::session);
        let bus = connector.ensure_connected().await?;

        Ok(RelayService {
            config,
            bus,
            log: self.log,
        })
    }
}

impl fmt::Debug for RelayServiceBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayServiceBuilder")
            .field("config", &self.config)
            .field("connector", &self.connector)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<(String, String, String)>>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl SignalSink for Recorder {
        async fn emit(&self, signal: &BusSignal<'_>) -> Result<(), BusError> {
            let (w, l, c) = signal.body();
            self.sent
                .lock()
                .unwrap()
                .push((w.to_string(), l.to_string(), c.to_string()));
            match &self.fail_with {
                Some(message) => Err(BusError::Send(message.clone())),
                None => Ok(()),
            }
        }
    }

    struct Unreachable;

    #[async_trait]
    impl Dialer for Unreachable {
        async fn dial(&self) -> Result<Arc<dyn SignalSink>, BusError> {
            Err(BusError::Connect(zbus::Error::Failure(
                "connection refused".into(),
            )))
        }
    }

    async fn relay_with(sink: Arc<Recorder>) -> RelayService {
        RelayService::builder()
            .connection(sink)
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn build_fails_when_bus_unreachable() {
        let err = RelayService::builder()
            .dialer(Unreachable)
            .build()
            .await
            .err()
            .expect("build should fail");
        assert!(matches!(err, ConfigError::Connect(_)));
        assert!(err.to_string().contains("could not fetch session bus"));
    }

    #[tokio::test]
    async fn invalid_settings_rejected_before_dialing() {
        let err = RelayService::builder()
            .port(0)
            .dialer(Unreachable)
            .build()
            .await
            .err()
            .expect("build should fail");
        assert!(matches!(err, ConfigError::Invalid { field: "port", .. }));
    }

    #[tokio::test]
    async fn settings_shape_listen_addr() {
        let relay = RelayService::builder()
            .host("0.0.0.0")
            .port(8080)
            .connection(Arc::new(Recorder::default()))
            .build()
            .await
            .unwrap();
        assert_eq!(relay.listen_addr(), "0.0.0.0:8080");
    }

    #[tokio::test]
    async fn window_id_is_trimmed() {
        let sink = Arc::new(Recorder::default());
        let relay = relay_with(Arc::clone(&sink)).await;

        relay.handle("  main\t", b"{}").await.unwrap();

        let sent = sink.sent.lock().unwrap();
        assert_eq!(
            sent.as_slice(),
            [("main".to_string(), String::new(), String::new())]
        );
    }

    #[tokio::test]
    async fn blank_window_id_skips_bus() {
        let sink = Arc::new(Recorder::default());
        let relay = relay_with(Arc::clone(&sink)).await;

        let err = relay.handle(" ", br#"{"label":"x"}"#).await.unwrap_err();
        assert!(matches!(err, RequestError::MissingWindowId));
        assert!(err.is_client_error());
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn send_failure_surfaces_message() {
        let sink = Arc::new(Recorder {
            fail_with: Some("no reply".into()),
            ..Recorder::default()
        });
        let relay = relay_with(sink).await;

        let err = relay.handle("main", b"{}").await.unwrap_err();
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "unable to raise signal: no reply");
    }
}
