//! LiveConfig - Config Loader output
//!
//! Dispatcher settings, hub sizing, channel rules and datasources.

use serde::{Deserialize, Serialize};

use crate::OrgId;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete live publishing configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiveConfig {
    #[serde(default)]
    pub version: ConfigVersion,

    #[serde(default)]
    pub dispatcher: DispatcherSettings,

    #[serde(default)]
    pub hub: HubSettings,

    #[serde(default)]
    pub context: ContextSettings,

    /// Channel conversion rules
    #[serde(default)]
    pub rules: Vec<RuleConfig>,

    /// Datasources available to plugin contexts
    #[serde(default)]
    pub datasources: Vec<DataSourceConfig>,
}

/// Dispatcher settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatcherSettings {
    /// Deadline for each collaborator call (None = wait for cancellation only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_timeout_ms: Option<u64>,
}

/// Local hub settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubSettings {
    /// Per-channel buffer; slow subscribers beyond it lag
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_channel_capacity() -> usize {
    128
}

/// Plugin context cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSettings {
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    5
}

/// Conversion rule for one channel of one org
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    pub org_id: OrgId,

    /// Tenant-local channel id (no org prefix)
    pub channel: String,

    pub converter: ConverterKind,

    #[serde(default)]
    pub outputs: Vec<OutputConfig>,
}

/// Payload converter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConverterKind {
    /// JSON object, top-level keys become fields
    JsonAuto,
    /// Serialized frame
    JsonFrame,
}

/// Frame output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputConfig {
    /// Publish frames as JSON to a channel of the same org
    Broadcast {
        /// Target channel id (None = `stream/<rule channel>`)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        channel: Option<String>,
    },
    /// Log a frame summary
    Log,
}

/// Datasource definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceConfig {
    pub org_id: OrgId,
    pub uid: String,
    pub name: String,
    pub plugin_id: String,

    #[serde(default)]
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_data: Option<serde_json::Value>,
}
