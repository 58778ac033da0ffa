//! Relay configuration.
//!
//! A [`RelayConfig`] can only be obtained through [`RelayConfig::builder`],
//! which validates the listen port and every bus-addressing field before
//! handing out an immutable value.

use zbus::names::{BusName, InterfaceName, MemberName};
use zbus::zvariant::ObjectPath;

use crate::bus::BusError;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 18989;
pub const DEFAULT_DESTINATION: &str = "org.gnome.Shell";
pub const DEFAULT_PATH: &str = "/org/shalott/dbus/DockIcon";
pub const DEFAULT_INTERFACE: &str = "org.shalott.dbus.DockIcon";
pub const DEFAULT_MEMBER: &str = "SetAppNotifications";

/// Errors raised while constructing the relay.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration value failed validation.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Name of the offending setting.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The session bus could not be reached and no connection was injected.
    #[error(transparent)]
    Connect(#[from] BusError),
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl ToString) -> Self {
        Self::Invalid {
            field,
            reason: reason.to_string(),
        }
    }
}

/// Where outbound signals are addressed on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusAddress {
    destination: String,
    path: String,
    interface: String,
    member: String,
}

impl BusAddress {
    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn member(&self) -> &str {
        &self.member
    }
}

/// Immutable relay configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    host: String,
    port: u16,
    bus: BusAddress,
}

impl RelayConfig {
    pub fn builder() -> RelayConfigBuilder {
        RelayConfigBuilder::default()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    pub const fn bus(&self) -> &BusAddress {
        &self.bus
    }

    /// `host:port` string the HTTP server should bind to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            bus: BusAddress {
                destination: DEFAULT_DESTINATION.to_string(),
                path: DEFAULT_PATH.to_string(),
                interface: DEFAULT_INTERFACE.to_string(),
                member: DEFAULT_MEMBER.to_string(),
            },
        }
    }
}

/// Collects settings for a [`RelayConfig`]; unset fields keep their defaults.
#[derive(Debug, Clone, Default)]
pub struct RelayConfigBuilder {
    config: RelayConfig,
}

impl RelayConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.config.bus.destination = destination.into();
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.config.bus.path = path.into();
        self
    }

    pub fn interface(mut self, interface: impl Into<String>) -> Self {
        self.config.bus.interface = interface.into();
        self
    }

    pub fn member(mut self, member: impl Into<String>) -> Self {
        self.config.bus.member = member.into();
        self
    }

    /// Validate the collected settings.
    pub fn build(self) -> Result<RelayConfig, ConfigError> {
        let config = self.config;

        if config.host.trim().is_empty() {
            return Err(ConfigError::invalid("host", "must not be empty"));
        }
        if config.port == 0 {
            return Err(ConfigError::invalid("port", "must be between 1 and 65535"));
        }

        let bus = &config.bus;
        BusName::try_from(bus.destination.as_str())
            .map_err(|e| ConfigError::invalid("destination", e))?;
        ObjectPath::try_from(bus.path.as_str()).map_err(|e| ConfigError::invalid("path", e))?;
        InterfaceName::try_from(bus.interface.as_str())
            .map_err(|e| ConfigError::invalid("interface", e))?;
        MemberName::try_from(bus.member.as_str())
            .map_err(|e| ConfigError::invalid("member", e))?;

        Ok(config)
    }
}
