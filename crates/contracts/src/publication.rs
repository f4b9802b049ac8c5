//! Publication - Hub input
//!
//! Raw payload handed to the local hub for delivery.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Position of a publication inside a channel's history stream.
///
/// Owned by the hub; used for ordered delivery and resume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamPosition {
    /// Offset inside the stream
    pub offset: u64,
    /// Stream generation; changes when history is reset
    pub epoch: String,
}

/// Publication delivered to channel subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publication {
    /// Raw payload, delivered unchanged
    pub data: Bytes,

    /// Stream position (None = unset, hub does not track ordering)
    pub position: Option<StreamPosition>,
}

impl Publication {
    /// Publication without a stream position
    pub fn unpositioned(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            position: None,
        }
    }
}
