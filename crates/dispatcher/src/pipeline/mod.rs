//! In-memory rule pipeline
//!
//! Contains the converters, the frame outputs and the [`RuleRegistry`]
//! gateway that ties them to org-scoped channels.

pub mod converter;
mod output;
mod registry;

pub use self::output::FrameOutput;
pub use self::registry::{ChannelRule, RuleRegistry};
