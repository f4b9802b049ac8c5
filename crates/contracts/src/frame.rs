//! ChannelFrame - Pipeline Gateway output
//!
//! Structured units produced by converting a raw payload.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named set of fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Frame name (usually the source channel)
    pub name: String,

    /// Field name -> value
    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl Frame {
    /// Create an empty frame
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Add a field (builder style)
    pub fn with_field(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }
}

/// Frame addressed to a tenant-local channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelFrame {
    /// Target channel id inside the org ("" = source channel)
    pub channel: String,

    /// Frame data
    pub frame: Frame,
}

/// Result of a successful conversion attempt
///
/// A failed conversion is reported through the `Err` side of the call.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionOutcome {
    /// No conversion rule applies to the channel
    NoRule,
    /// Rule applied and produced frames
    Frames(Vec<ChannelFrame>),
}
