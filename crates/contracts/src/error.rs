//! Layered error definitions
//!
//! Categorized by source: address / rules / hub / context / config

use thiserror::Error;

/// Channel address errors
///
/// Produced by the org channel codec. Always deterministic for a given input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Empty channel string
    #[error("empty channel address")]
    Empty,

    /// Character outside of the channel alphabet
    #[error("invalid character {found:?} in channel '{channel}'")]
    InvalidCharacter { channel: String, found: char },

    /// Leading, trailing or doubled separator
    #[error("empty path segment in channel '{channel}'")]
    EmptySegment { channel: String },

    /// Org prefix is not a canonical positive integer
    #[error("invalid org id '{org}' in channel '{channel}'")]
    InvalidOrgId { channel: String, org: String },

    /// Org prefix without a channel id after it
    #[error("missing channel id after org prefix in channel '{channel}'")]
    MissingChannelId { channel: String },

    /// Unscoped channel whose first segment reads as an org prefix
    #[error("unscoped channel '{channel}' starts with a numeric segment")]
    ScopeCollision { channel: String },
}

/// Unified collaborator error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Rule Registry Errors =====
    /// Rule lookup failed
    #[error("rule lookup failed for org {org_id} channel '{channel}': {message}")]
    RuleLookup {
        org_id: i64,
        channel: String,
        message: String,
    },

    /// Payload could not be converted to frames
    #[error("conversion failed for channel '{channel}': {message}")]
    Conversion { channel: String, message: String },

    /// Frame output failed
    #[error("output '{output}' failed: {message}")]
    Output { output: String, message: String },

    // ===== Hub Errors =====
    /// Hub no longer accepts publications
    #[error("hub is closed")]
    HubClosed,

    /// Hub delivery failure
    #[error("hub delivery to '{channel}' failed: {message}")]
    HubDelivery { channel: String, message: String },

    // ===== Context Errors =====
    /// Datasource exists but belongs to another plugin
    #[error("datasource '{datasource_uid}' is not a '{plugin_id}' datasource")]
    PluginMismatch {
        plugin_id: String,
        datasource_uid: String,
    },

    // ===== General Errors =====
    /// Channel address error
    #[error("address error: {0}")]
    Address(#[from] AddressError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create rule lookup error
    pub fn rule_lookup(org_id: i64, channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RuleLookup {
            org_id,
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Create conversion error
    pub fn conversion(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conversion {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Create output error
    pub fn output(output: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Output {
            output: output.into(),
            message: message.into(),
        }
    }

    /// Create hub delivery error
    pub fn hub_delivery(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HubDelivery {
            channel: channel.into(),
            message: message.into(),
        }
    }
}
