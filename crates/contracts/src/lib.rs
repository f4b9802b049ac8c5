//! # Contracts
//!
//! Interface contracts shared by the live publishing crates: channel
//! addressing, publications, frames, collaborator traits and configuration.
//! Business crates depend on this crate, never the other way around.
//!
//! ## Addressing
//! - Channels are flat strings, optionally prefixed with an org id (`1/weather`)
//! - See [`org_channel`] for the grammar

mod channel_id;
mod config;
mod error;
mod frame;
mod gateway;
mod hub;
pub mod org_channel;
mod plugin_context;
mod publication;

pub use channel_id::ChannelId;
pub use config::*;
pub use error::*;
pub use frame::*;
pub use gateway::{LocalPipelineGateway, PipelineGateway};
pub use hub::{BroadcastHub, LocalBroadcastHub};
pub use org_channel::OrgId;
pub use plugin_context::*;
pub use publication::*;
