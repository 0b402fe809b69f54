// ============================================
// File: crates/bondlink-node/src/config.rs
// ============================================
//! # Node Configuration
//!
//! ## Creation Reason
//! One file sets everything a connection needs before it starts: link
//! identity, protocol features, pipeline tuning and timers.
//!
//! ## Main Functionality
//! - `NodeConfig`: main configuration structure
//! - TOML file loading and parsing
//! - Configuration validation
//! - Conversion into `ControllerConfig` and `PipelineSettings`
//!
//! ## Configuration Sections
//! - `node`: mode, application id, device ids, features, message size
//! - `pipeline`: dispatch queue, overflow policy, enqueue filter
//! - `timeouts`: transaction and status-check budgets
//! - `pairing`: consecutive-error revert threshold
//! - `logging`: log level
//!
//! ## Example Configuration
//! ```toml
//! [node]
//! mode = "client"
//! device_id = 1
//! peer_device_id = 2
//!
//! [pipeline]
//! queue_capacity = 32
//! overflow = "block"
//! enqueue = ["data", "ticket"]
//!
//! [timeouts]
//! transaction_ms = 5000
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Configuration is immutable once a connection started
//! - Validate config before starting a connection
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use bondlink_common::DeviceId;
use bondlink_core::protocol::{HEADER_SIZE, MAX_FRAME_SIZE};
use bondlink_core::{ControllerConfig, FeatureFlags, OperatingMode};

use crate::error::{NodeError, Result};
use crate::pipeline::{MessageSet, OverflowPolicy, PipelineSettings};

// ============================================
// NodeConfig
// ============================================

/// Main node configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Link identity and protocol features.
    #[serde(default)]
    pub node: LinkSection,

    /// Receive/dispatch pipeline tuning.
    #[serde(default)]
    pub pipeline: PipelineSection,

    /// Timer budgets.
    #[serde(default)]
    pub timeouts: TimeoutsSection,

    /// Pairing policy.
    #[serde(default)]
    pub pairing: PairingSection,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl NodeConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    /// Returns error if file cannot be read, parsed or validated.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        info!("Loading configuration from: {}", path_str);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| NodeError::config_load(&path_str, e.to_string()))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| NodeError::config_load(&path_str, e.to_string()))?;

        config.validate()?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Parses and validates configuration from a string.
    ///
    /// # Errors
    /// Returns error if the string cannot be parsed or validated.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| NodeError::config_load("<string>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// The first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.node.validate()?;
        self.pipeline.validate()?;
        self.timeouts.validate()?;
        self.pairing.validate()?;
        Ok(())
    }

    /// Serializes configuration to TOML string.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Controller settings derived from this configuration.
    #[must_use]
    pub fn controller_config(&self) -> ControllerConfig {
        let mut features = FeatureFlags::empty();
        features.set(FeatureFlags::PAIRING_REQUIRED, self.node.pairing_required);
        features.set(FeatureFlags::STATUS_CHECK, self.node.status_check);

        let mut config = ControllerConfig::new(self.node.mode, DeviceId::from(self.node.device_id));
        config.app_id = self.node.app_id;
        config.peer_device_id = self.node.peer_device_id.map(DeviceId::from);
        config.features = features;
        config.max_message_size = self.node.max_message_size;
        config.transaction_timeout = Duration::from_millis(self.timeouts.transaction_ms);
        config.status_check_timeout = Duration::from_millis(self.timeouts.status_check_ms);
        config.pairing_error_threshold = self.pairing.revert_threshold;
        config
    }

    /// Pipeline settings derived from this configuration.
    ///
    /// # Errors
    /// `ConfigInvalid` if the enqueue filter names an unknown type.
    pub fn pipeline_settings(&self) -> Result<Arc<PipelineSettings>> {
        Ok(Arc::new(PipelineSettings {
            queue_capacity: self.pipeline.queue_capacity,
            overflow: self.pipeline.overflow,
            enqueue: self.pipeline.enqueue_set()?,
            receive_timeout: Duration::from_millis(self.pipeline.receive_timeout_ms),
            report_failures: self.pipeline.report_failures,
        }))
    }

    /// The same link seen from the other end: roles and device ids
    /// swapped, everything else shared.
    #[must_use]
    pub fn mirrored(&self) -> Self {
        let mut peer = self.clone();
        peer.node.mode = match self.node.mode {
            OperatingMode::Client => OperatingMode::Server,
            OperatingMode::Server => OperatingMode::Client,
            OperatingMode::Uninitialized => OperatingMode::Uninitialized,
        };
        peer.node.device_id = self
            .node
            .peer_device_id
            .unwrap_or_else(|| self.node.device_id.wrapping_add(1));
        peer.node.peer_device_id = Some(self.node.device_id);
        peer
    }
}

// ============================================
// LinkSection
// ============================================

/// `[node]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSection {
    /// Operating mode (`client` or `server`).
    #[serde(default = "default_mode")]
    pub mode: OperatingMode,

    /// Application identifier.
    #[serde(default)]
    pub app_id: u32,

    /// Local device identifier.
    #[serde(default = "default_device_id")]
    pub device_id: u64,

    /// Only accept pairing from this device, if set.
    #[serde(default)]
    pub peer_device_id: Option<u64>,

    /// Refuse payload types until pairing is mutually confirmed.
    #[serde(default = "default_true")]
    pub pairing_required: bool,

    /// Enable the status-check sub-protocol.
    #[serde(default = "default_true")]
    pub status_check: bool,

    /// Largest frame accepted or sent, header included.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

fn default_mode() -> OperatingMode {
    OperatingMode::Client
}

fn default_device_id() -> u64 {
    1
}

fn default_true() -> bool {
    true
}

fn default_max_message_size() -> usize {
    512
}

impl LinkSection {
    fn validate(&self) -> Result<()> {
        if self.mode == OperatingMode::Uninitialized {
            return Err(NodeError::config_invalid(
                "node.mode",
                "must be client or server",
            ));
        }

        if self.device_id == 0 {
            return Err(NodeError::config_invalid(
                "node.device_id",
                "must not be 0",
            ));
        }

        if self.peer_device_id == Some(self.device_id) {
            return Err(NodeError::config_invalid(
                "node.peer_device_id",
                "must differ from node.device_id",
            ));
        }

        if self.max_message_size <= HEADER_SIZE || self.max_message_size > MAX_FRAME_SIZE {
            return Err(NodeError::config_invalid(
                "node.max_message_size",
                format!("must be in {}..={}", HEADER_SIZE + 1, MAX_FRAME_SIZE),
            ));
        }

        Ok(())
    }
}

impl Default for LinkSection {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            app_id: 0,
            device_id: default_device_id(),
            peer_device_id: None,
            pairing_required: true,
            status_check: true,
            max_message_size: default_max_message_size(),
        }
    }
}

// ============================================
// PipelineSection
// ============================================

/// `[pipeline]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Dispatch queue capacity.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Full-queue behavior (`block` or `drop`).
    #[serde(default)]
    pub overflow: OverflowPolicy,

    /// Message type names forwarded to the application.
    #[serde(default = "default_enqueue")]
    pub enqueue: Vec<String>,

    /// Bound on one transport receive call, in milliseconds.
    #[serde(default = "default_receive_timeout_ms")]
    pub receive_timeout_ms: u64,

    /// Forward receive failures to the application.
    #[serde(default = "default_true")]
    pub report_failures: bool,
}

fn default_queue_capacity() -> usize {
    32
}

fn default_enqueue() -> Vec<String> {
    MessageSet::APPLICATION.names()
}

fn default_receive_timeout_ms() -> u64 {
    100
}

impl PipelineSection {
    fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(NodeError::config_invalid(
                "pipeline.queue_capacity",
                "must be greater than 0",
            ));
        }

        if self.receive_timeout_ms == 0 {
            return Err(NodeError::config_invalid(
                "pipeline.receive_timeout_ms",
                "must be greater than 0",
            ));
        }

        self.enqueue_set().map(|_| ())
    }

    fn enqueue_set(&self) -> Result<MessageSet> {
        MessageSet::from_names(&self.enqueue).map_err(|name| {
            NodeError::config_invalid("pipeline.enqueue", format!("unknown message type '{name}'"))
        })
    }
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            overflow: OverflowPolicy::default(),
            enqueue: default_enqueue(),
            receive_timeout_ms: default_receive_timeout_ms(),
            report_failures: true,
        }
    }
}

// ============================================
// TimeoutsSection
// ============================================

/// `[timeouts]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutsSection {
    /// Transaction inactivity budget, in milliseconds.
    #[serde(default = "default_transaction_ms")]
    pub transaction_ms: u64,

    /// Status-check response budget, in milliseconds.
    #[serde(default = "default_status_check_ms")]
    pub status_check_ms: u64,
}

fn default_transaction_ms() -> u64 {
    5_000
}

fn default_status_check_ms() -> u64 {
    2_000
}

impl TimeoutsSection {
    fn validate(&self) -> Result<()> {
        if self.transaction_ms == 0 {
            return Err(NodeError::config_invalid(
                "timeouts.transaction_ms",
                "must be greater than 0",
            ));
        }

        if self.status_check_ms == 0 {
            return Err(NodeError::config_invalid(
                "timeouts.status_check_ms",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Default for TimeoutsSection {
    fn default() -> Self {
        Self {
            transaction_ms: default_transaction_ms(),
            status_check_ms: default_status_check_ms(),
        }
    }
}

// ============================================
// PairingSection
// ============================================

/// `[pairing]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingSection {
    /// Consecutive pairing errors before the link key is dropped.
    #[serde(default = "default_revert_threshold")]
    pub revert_threshold: u32,
}

fn default_revert_threshold() -> u32 {
    3
}

impl PairingSection {
    fn validate(&self) -> Result<()> {
        if self.revert_threshold == 0 {
            return Err(NodeError::config_invalid(
                "pairing.revert_threshold",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

impl Default for PairingSection {
    fn default() -> Self {
        Self {
            revert_threshold: default_revert_threshold(),
        }
    }
}

// ============================================
// LoggingSection
// ============================================

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSection {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.node.mode, OperatingMode::Client);
        assert_eq!(
            config.pipeline_settings().unwrap().enqueue,
            MessageSet::APPLICATION
        );
    }

    #[test]
    fn test_full_config_format() {
        let toml = r#"
            [node]
            mode = "server"
            app_id = 7
            device_id = 2
            peer_device_id = 1
            status_check = false
            max_message_size = 256

            [pipeline]
            queue_capacity = 8
            overflow = "drop"
            enqueue = ["data", "error"]
            receive_timeout_ms = 50
            report_failures = false

            [timeouts]
            transaction_ms = 1000
            status_check_ms = 500

            [pairing]
            revert_threshold = 5

            [logging]
            level = "debug"
        "#;

        let config = NodeConfig::from_str(toml).unwrap();
        let controller = config.controller_config();
        assert_eq!(controller.mode, OperatingMode::Server);
        assert_eq!(controller.app_id, 7);
        assert_eq!(controller.device_id, DeviceId::from(2));
        assert_eq!(controller.peer_device_id, Some(DeviceId::from(1)));
        assert_eq!(controller.features, FeatureFlags::PAIRING_REQUIRED);
        assert_eq!(controller.max_message_size, 256);
        assert_eq!(controller.transaction_timeout, Duration::from_secs(1));
        assert_eq!(controller.pairing_error_threshold, 5);

        let pipeline = config.pipeline_settings().unwrap();
        assert_eq!(pipeline.overflow, OverflowPolicy::Drop);
        assert_eq!(pipeline.enqueue, MessageSet::DATA | MessageSet::ERROR);
        assert!(!pipeline.report_failures);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_values() {
        let cases = [
            ("[node]\nmode = \"uninitialized\"", "node.mode"),
            ("[node]\ndevice_id = 0", "node.device_id"),
            ("[node]\ndevice_id = 3\npeer_device_id = 3", "node.peer_device_id"),
            ("[node]\nmax_message_size = 47", "node.max_message_size"),
            ("[node]\nmax_message_size = 70000", "node.max_message_size"),
            ("[pipeline]\nqueue_capacity = 0", "pipeline.queue_capacity"),
            ("[pipeline]\nenqueue = [\"Nope\"]", "pipeline.enqueue"),
            ("[timeouts]\ntransaction_ms = 0", "timeouts.transaction_ms"),
            ("[pairing]\nrevert_threshold = 0", "pairing.revert_threshold"),
        ];
        for (toml, field) in cases {
            match NodeConfig::from_str(toml) {
                Err(NodeError::ConfigInvalid { field: f, .. }) => assert_eq!(f, field),
                other => panic!("{toml}: expected {field} error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_toml_round_trip() {
        let config = NodeConfig::default();
        let parsed = NodeConfig::from_str(&config.to_toml()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_mirrored() {
        let mut config = NodeConfig::default();
        config.node.peer_device_id = Some(9);
        let peer = config.mirrored();
        assert_eq!(peer.node.mode, OperatingMode::Server);
        assert_eq!(peer.node.device_id, 9);
        assert_eq!(peer.node.peer_device_id, Some(1));
        assert!(peer.validate().is_ok());
    }
}
