//! Dispatcher error types

use std::fmt;

use contracts::{AddressError, ChannelId, ContractError};
use thiserror::Error;

/// Step of a publish call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Channel address decoding
    Decode,
    /// Rule existence lookup
    Lookup,
    /// Payload conversion
    Convert,
    /// Frame processing
    Process,
    /// Raw broadcast
    Broadcast,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Decode => "decode",
            Step::Lookup => "lookup",
            Step::Convert => "convert",
            Step::Process => "process",
            Step::Broadcast => "broadcast",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publish dispatch errors
///
/// Broadcast failures never embed the payload.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Malformed channel address
    #[error("invalid channel address: {0}")]
    Address(#[from] AddressError),

    /// Rule registry lookup or conversion failure
    #[error("rule {step} failed for channel '{channel}': {source}")]
    Gateway {
        channel: String,
        step: Step,
        #[source]
        source: ContractError,
    },

    /// Rule reported as existing but conversion found none
    #[error("no conversion rule for channel {channel}")]
    Conversion { channel: ChannelId },

    /// Frame processing failure
    #[error("error processing frames for channel '{channel}': {source}")]
    Processing {
        channel: String,
        #[source]
        source: ContractError,
    },

    /// Hub delivery failure
    #[error("error publishing to channel '{channel}': {source}")]
    Broadcast {
        channel: String,
        #[source]
        source: ContractError,
    },

    /// Caller cancelled while a step was running
    #[error("{step} cancelled for channel '{channel}'")]
    Cancelled { channel: String, step: Step },

    /// Step exceeded the configured call deadline
    #[error("{step} timed out after {timeout_ms}ms for channel '{channel}'")]
    Timeout {
        channel: String,
        step: Step,
        timeout_ms: u64,
    },
}

impl DispatchError {
    /// Step the call failed at
    pub fn step(&self) -> Step {
        match self {
            Self::Address(_) => Step::Decode,
            Self::Gateway { step, .. } => *step,
            Self::Conversion { .. } => Step::Convert,
            Self::Processing { .. } => Step::Process,
            Self::Broadcast { .. } => Step::Broadcast,
            Self::Cancelled { step, .. } | Self::Timeout { step, .. } => *step,
        }
    }

    /// Whether the caller may retry the same publish
    ///
    /// Address, conversion disagreement and processing errors are not
    /// transient.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Gateway { .. } | Self::Broadcast { .. } | Self::Cancelled { .. } | Self::Timeout { .. }
        )
    }

    /// Short label for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Address(_) => "address",
            Self::Gateway { .. } => "gateway",
            Self::Conversion { .. } => "conversion",
            Self::Processing { .. } => "processing",
            Self::Broadcast { .. } => "broadcast",
            Self::Cancelled { .. } => "cancelled",
            Self::Timeout { .. } => "timeout",
        }
    }
}
