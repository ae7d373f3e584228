//! Relay configuration types.
//!
//! [`RelayConfig`] is the single source of truth for all runtime settings.
//! It is assembled in three layers, later layers winning:
//!
//! 1. [`RelayConfig::default`]: built-in defaults (port 8000, path `/ws`,
//!    static files from `./public`).
//! 2. An optional TOML file, parsed into [`ConfigOverrides`].
//! 3. Explicit CLI flags / environment variables, also as [`ConfigOverrides`].
//!
//! # Config file format
//!
//! Every key is optional:
//!
//! ```toml
//! bind = "127.0.0.1"
//! port = 8000
//! ws_path = "/ws"
//! queue_capacity = 256
//! send_timeout_ms = 5000
//! static_dir = "./public"
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use relay_core::HubConfig;
use serde::Deserialize;
use thiserror::Error;

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The bind address is not a valid IP address.
    #[error("invalid bind address: '{0}'")]
    InvalidAddress(String),

    /// A value is out of range.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// All runtime configuration for the relay server.
///
/// Build this once at startup and share it with the accept loop.
///
/// # Example
///
/// ```rust
/// use relay_server::domain::RelayConfig;
///
/// let cfg = RelayConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 8000);
/// assert_eq!(cfg.ws_path, "/ws");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    /// The address and port the WebSocket server binds to.
    pub bind_addr: SocketAddr,

    /// Request path on which WebSocket upgrades are accepted.  Every other
    /// path is looked up in `static_dir`.
    pub ws_path: String,

    /// Directory whose files are served over plain HTTP GET (the chat
    /// front-end).  A missing directory just means every lookup is a 404.
    pub static_dir: PathBuf,

    /// Capacity of the hub's inbound message queue.
    pub queue_capacity: usize,

    /// Upper bound on writing one message to one client.  A client that does
    /// not accept the write in time is dropped from the broadcast audience.
    pub send_timeout: Duration,
}

impl Default for RelayConfig {
    /// | Field           | Default          |
    /// |-----------------|------------------|
    /// | bind_addr       | `0.0.0.0:8000`   |
    /// | ws_path         | `/ws`            |
    /// | static_dir      | `./public`       |
    /// | queue_capacity  | 256              |
    /// | send_timeout    | 5 seconds        |
    fn default() -> Self {
        let hub = HubConfig::default();
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            ws_path: "/ws".to_string(),
            static_dir: PathBuf::from("./public"),
            queue_capacity: hub.queue_capacity,
            send_timeout: hub.send_timeout,
        }
    }
}

impl RelayConfig {
    /// Returns a copy of `self` with every field present in `overrides`
    /// replaced.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAddress`] if `overrides.bind` is not an
    /// IP address.
    pub fn apply(mut self, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        if let Some(bind) = &overrides.bind {
            let ip: IpAddr = bind
                .parse()
                .map_err(|_| ConfigError::InvalidAddress(bind.clone()))?;
            self.bind_addr.set_ip(ip);
        }
        if let Some(port) = overrides.port {
            self.bind_addr.set_port(port);
        }
        if let Some(ws_path) = &overrides.ws_path {
            self.ws_path = ws_path.clone();
        }
        if let Some(dir) = &overrides.static_dir {
            self.static_dir = dir.clone();
        }
        if let Some(capacity) = overrides.queue_capacity {
            self.queue_capacity = capacity;
        }
        if let Some(ms) = overrides.send_timeout_ms {
            self.send_timeout = Duration::from_millis(ms);
        }
        Ok(self)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a zero queue capacity, a zero
    /// send timeout, or a WebSocket path that does not start with `/` or that
    /// uses route-pattern syntax (`{..}`, `:name`, `*rest`).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "queue_capacity must be greater than 0".to_string(),
            ));
        }
        if self.send_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "send_timeout must be greater than 0".to_string(),
            ));
        }
        if !self.ws_path.starts_with('/') {
            return Err(ConfigError::InvalidValue(format!(
                "ws_path must start with '/': '{}'",
                self.ws_path
            )));
        }
        let is_pattern = self.ws_path.contains(|c: char| c == '{' || c == '}')
            || self
                .ws_path
                .split('/')
                .any(|segment| segment.starts_with(':') || segment.starts_with('*'));
        if is_pattern {
            return Err(ConfigError::InvalidValue(format!(
                "ws_path must be a literal path: '{}'",
                self.ws_path
            )));
        }
        Ok(())
    }

    /// The hub settings derived from this config.
    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            queue_capacity: self.queue_capacity,
            send_timeout: self.send_timeout,
        }
    }
}

/// A partial configuration: every field is optional.
///
/// Used for both the TOML config file and the explicit CLI flags.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    /// IP address to bind to.
    pub bind: Option<String>,
    /// TCP port to listen on.
    pub port: Option<u16>,
    /// WebSocket upgrade path.
    pub ws_path: Option<String>,
    /// Directory served for non-WebSocket requests.
    pub static_dir: Option<PathBuf>,
    /// Inbound queue capacity.
    pub queue_capacity: Option<usize>,
    /// Per-delivery timeout in milliseconds.
    pub send_timeout_ms: Option<u64>,
}

impl ConfigOverrides {
    /// Parses overrides from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid TOML, wrong value types, or
    /// unknown keys.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if its content is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_is_8000() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.bind_addr.port(), 8000);
    }

    #[test]
    fn test_default_binds_all_interfaces() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.bind_addr.ip().to_string(), "0.0.0.0");
    }

    #[test]
    fn test_default_ws_path_and_hub_settings() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.ws_path, "/ws");
        assert_eq!(cfg.queue_capacity, 256);
        assert_eq!(cfg.send_timeout, Duration::from_secs(5));
        assert_eq!(cfg.static_dir, PathBuf::from("./public"));
    }

    #[test]
    fn test_default_validates() {
        assert!(RelayConfig::default().validate().is_ok());
    }

    #[test]
    fn test_apply_empty_overrides_is_identity() {
        let cfg = RelayConfig::default()
            .apply(&ConfigOverrides::default())
            .unwrap();
        assert_eq!(cfg, RelayConfig::default());
    }

    #[test]
    fn test_apply_replaces_present_fields_only() {
        let overrides = ConfigOverrides {
            bind: Some("127.0.0.1".to_string()),
            port: Some(9000),
            send_timeout_ms: Some(250),
            ..ConfigOverrides::default()
        };

        let cfg = RelayConfig::default().apply(&overrides).unwrap();

        assert_eq!(cfg.bind_addr.to_string(), "127.0.0.1:9000");
        assert_eq!(cfg.send_timeout, Duration::from_millis(250));
        assert_eq!(cfg.ws_path, "/ws");
        assert_eq!(cfg.queue_capacity, 256);
    }

    #[test]
    fn test_apply_invalid_bind_returns_error() {
        let overrides = ConfigOverrides {
            bind: Some("not.an.ip".to_string()),
            ..ConfigOverrides::default()
        };
        let result = RelayConfig::default().apply(&overrides);
        assert!(matches!(result, Err(ConfigError::InvalidAddress(_))));
    }

    #[test]
    fn test_later_layer_wins() {
        let file = ConfigOverrides {
            port: Some(7000),
            ws_path: Some("/chat".to_string()),
            ..ConfigOverrides::default()
        };
        let cli = ConfigOverrides {
            port: Some(7001),
            ..ConfigOverrides::default()
        };

        let cfg = RelayConfig::default()
            .apply(&file)
            .and_then(|c| c.apply(&cli))
            .unwrap();

        assert_eq!(cfg.bind_addr.port(), 7001);
        assert_eq!(cfg.ws_path, "/chat");
    }

    #[test]
    fn test_validate_rejects_zero_queue_capacity() {
        let cfg = RelayConfig {
            queue_capacity: 0,
            ..RelayConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_validate_rejects_zero_send_timeout() {
        let cfg = RelayConfig {
            send_timeout: Duration::ZERO,
            ..RelayConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_relative_ws_path() {
        let cfg = RelayConfig {
            ws_path: "ws".to_string(),
            ..RelayConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_route_pattern_ws_path() {
        for path in ["/{room}", "/chat/:room", "/*rest"] {
            let cfg = RelayConfig {
                ws_path: path.to_string(),
                ..RelayConfig::default()
            };
            assert!(cfg.validate().is_err(), "{path} must be rejected");
        }
    }

    #[test]
    fn test_apply_static_dir() {
        let overrides = ConfigOverrides {
            static_dir: Some(PathBuf::from("/srv/chat")),
            ..ConfigOverrides::default()
        };
        let cfg = RelayConfig::default().apply(&overrides).unwrap();
        assert_eq!(cfg.static_dir, PathBuf::from("/srv/chat"));
    }

    #[test]
    fn test_hub_config_mirrors_fields() {
        let cfg = RelayConfig {
            queue_capacity: 8,
            send_timeout: Duration::from_millis(100),
            ..RelayConfig::default()
        };
        let hub = cfg.hub_config();
        assert_eq!(hub.queue_capacity, 8);
        assert_eq!(hub.send_timeout, Duration::from_millis(100));
    }

    #[test]
    fn test_overrides_from_toml() {
        let overrides = ConfigOverrides::from_toml_str(
            r#"
            bind = "127.0.0.1"
            port = 8080
            ws_path = "/chat"
            queue_capacity = 32
            send_timeout_ms = 1000
            static_dir = "web"
            "#,
        )
        .unwrap();

        assert_eq!(overrides.bind.as_deref(), Some("127.0.0.1"));
        assert_eq!(overrides.port, Some(8080));
        assert_eq!(overrides.ws_path.as_deref(), Some("/chat"));
        assert_eq!(overrides.queue_capacity, Some(32));
        assert_eq!(overrides.send_timeout_ms, Some(1000));
        assert_eq!(overrides.static_dir, Some(PathBuf::from("web")));
    }

    #[test]
    fn test_overrides_from_empty_toml_is_default() {
        let overrides = ConfigOverrides::from_toml_str("").unwrap();
        assert_eq!(overrides, ConfigOverrides::default());
    }

    #[test]
    fn test_overrides_reject_unknown_key() {
        let result = ConfigOverrides::from_toml_str("colour = \"blue\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file_returns_io_error() {
        let path = std::env::temp_dir().join("relay-server-missing-config-9f2c.toml");
        let result = ConfigOverrides::load(&path);
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_load_reads_file() {
        let path = std::env::temp_dir().join(format!(
            "relay-server-config-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "port = 8123\n").unwrap();

        let overrides = ConfigOverrides::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(overrides.port, Some(8123));
    }
}
