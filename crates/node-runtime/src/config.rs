//! # Peer Configuration
//!
//! One `PeerConfig` per overlay membership, built once at startup and
//! handed to every component.

use rl_01_storage::StorageConfig;
use rl_02_routing::RoutingConfig;
use rl_03_redir::RedirConfig;
use rl_04_gateway::GatewayConfig;
use serde::Deserialize;
use shared_types::{NodeId, ID_LEN};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Key used when a config file names none.
pub const DEFAULT_SHARED_KEY: &str = "reload-overlay";

/// Complete configuration of one peer in one overlay.
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// This peer's identity.
    pub node_id: NodeId,
    /// Overlay name.
    pub overlay: String,
    /// HMAC key shared by every peer of the overlay.
    pub shared_key: Vec<u8>,
    /// Namespaces this peer serves as a gateway.
    pub serves: Vec<String>,
    pub storage: StorageConfig,
    pub routing: RoutingConfig,
    pub redir: RedirConfig,
    pub gateway: GatewayConfig,
}

impl PeerConfig {
    /// Config for `node_id` in `overlay`, everything else defaulted.
    #[must_use]
    pub fn new(node_id: NodeId, overlay: impl Into<String>) -> Self {
        let overlay = overlay.into();
        Self {
            node_id,
            routing: RoutingConfig::for_overlay(overlay.clone()),
            gateway: GatewayConfig::for_overlay(overlay.clone()),
            overlay,
            shared_key: DEFAULT_SHARED_KEY.as_bytes().to_vec(),
            serves: Vec::new(),
            storage: StorageConfig::default(),
            redir: RedirConfig::default(),
        }
    }

    #[must_use]
    pub fn with_shared_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.shared_key = key.into();
        self
    }

    /// Serve `namespace` as a gateway.
    #[must_use]
    pub fn serving(mut self, namespace: impl Into<String>) -> Self {
        self.serves.push(namespace.into());
        self
    }

    #[must_use]
    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    /// Replace the routing config, keeping this peer's overlay name.
    #[must_use]
    pub fn with_routing(mut self, routing: RoutingConfig) -> Self {
        self.routing = RoutingConfig {
            overlay_name: self.overlay.clone(),
            ..routing
        };
        self
    }

    #[must_use]
    pub fn with_redir(mut self, redir: RedirConfig) -> Self {
        self.redir = redir;
        self
    }

    /// Replace the gateway config, keeping this peer's overlay name.
    #[must_use]
    pub fn with_gateway(mut self, gateway: GatewayConfig) -> Self {
        self.gateway = GatewayConfig {
            overlay_name: self.overlay.clone(),
            ..gateway
        };
        self
    }
}

/// Errors that can occur during config loading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {error}")]
    Io { path: String, error: String },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid node id {0:?}")]
    InvalidNodeId(String),

    #[error("invalid redir section: {0}")]
    InvalidRedir(String),
}

// ============================================================================
// TomlConfigProvider
// ============================================================================

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    peer: PeerSection,
    #[serde(default)]
    routing: RoutingSection,
    #[serde(default)]
    storage: StorageSection,
    #[serde(default)]
    redir: RedirSection,
    #[serde(default)]
    gateway: GatewaySection,
}

#[derive(Debug, Deserialize, Default)]
struct PeerSection {
    node_id: Option<String>,
    overlay: Option<String>,
    shared_key: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RoutingSection {
    request_timeout_ms: Option<u64>,
    initial_ttl: Option<u8>,
    local_address: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct StorageSection {
    sweep_interval_secs: Option<u64>,
    sign_unsigned_values: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct RedirSection {
    starting_level: Option<u32>,
    max_level: Option<u32>,
    record_lifetime_secs: Option<u64>,
    refresh_interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct GatewaySection {
    max_queued_per_namespace: Option<usize>,
    #[serde(default)]
    serves: Vec<String>,
}

/// TOML-based configuration provider.
///
/// # Config File Format
///
/// ```toml
/// [peer]
/// node_id = "40000000000000000000000000000000"
/// overlay = "red"
/// shared_key = "red-secret"
///
/// [routing]
/// request_timeout_ms = 3000
/// initial_ttl = 100
///
/// [storage]
/// sweep_interval_secs = 60
///
/// [redir]
/// starting_level = 2
/// max_level = 16
/// record_lifetime_secs = 3600
/// refresh_interval_secs = 1800
///
/// [gateway]
/// max_queued_per_namespace = 256
/// serves = ["blue"]
/// ```
///
/// Every key is optional. A missing node id is drawn at random.
#[derive(Debug, Clone)]
pub struct TomlConfigProvider {
    config: PeerConfig,
}

impl TomlConfigProvider {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// `Parse` for malformed TOML, `InvalidNodeId` for a node id that is not
    /// 32 hex digits, `InvalidRedir` for out-of-range levels.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let node_id = match file.peer.node_id {
            Some(hex_id) => parse_node_id(&hex_id)?,
            None => NodeId::new(rand::random::<[u8; ID_LEN]>()),
        };
        let overlay = file.peer.overlay.unwrap_or_else(|| "reload".to_string());
        let mut config = PeerConfig::new(node_id, overlay);

        if let Some(key) = file.peer.shared_key {
            config.shared_key = key.into_bytes();
        }

        let rs = file.routing;
        if let Some(ms) = rs.request_timeout_ms {
            config.routing.request_timeout = Duration::from_millis(ms);
        }
        if let Some(ttl) = rs.initial_ttl {
            config.routing.initial_ttl = ttl;
        }
        if let Some(address) = rs.local_address {
            config.routing.local_address = address;
        }

        let ss = file.storage;
        if let Some(secs) = ss.sweep_interval_secs {
            config.storage.sweep_interval = Duration::from_secs(secs);
        }
        if let Some(sign) = ss.sign_unsigned_values {
            config.storage.sign_unsigned_values = sign;
        }

        let rd = file.redir;
        let defaults = RedirConfig::default();
        let mut redir = RedirConfig {
            starting_level: rd.starting_level.unwrap_or(defaults.starting_level),
            max_level: rd.max_level.unwrap_or(defaults.max_level),
            ..defaults
        };
        if let Some(secs) = rd.record_lifetime_secs {
            redir = redir.with_record_lifetime(Duration::from_secs(secs));
        }
        if let Some(secs) = rd.refresh_interval_secs {
            redir = redir.with_refresh_interval(Duration::from_secs(secs));
        }
        config.redir = redir;
        config
            .redir
            .validate()
            .map_err(|e| ConfigError::InvalidRedir(e.to_string()))?;

        let gs = file.gateway;
        if let Some(limit) = gs.max_queued_per_namespace {
            config.gateway.max_queued_per_namespace = limit;
        }
        config.serves = gs.serves;

        Ok(Self { config })
    }

    /// The parsed configuration.
    #[must_use]
    pub fn peer_config(&self) -> &PeerConfig {
        &self.config
    }

    #[must_use]
    pub fn into_peer_config(self) -> PeerConfig {
        self.config
    }
}

fn parse_node_id(hex_id: &str) -> Result<NodeId, ConfigError> {
    NodeId::from_hex(hex_id).map_err(|_| ConfigError::InvalidNodeId(hex_id.to_string()))
}
