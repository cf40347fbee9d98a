//! Core types for the plugin
//!
//! This module provides the fundamental types used throughout the crate:
//! - `Payload` / `PayloadData` / `PayloadFlags` - Data sent over channels
//! - `InvokeCommand` / `Command` - Commands delivered by the host
//! - `ResourceInfo` / `ResourceState` - Credentials delivered at startup
//! - `PluginError` - Error types

pub mod error;
pub mod payload;
pub mod resource;

pub use error::{PluginError, PluginResult};
pub use payload::{
    Aux, ChannelId, Command, InvokeCommand, Payload, PayloadData, PayloadFlags,
    StopStreamCommand,
};
pub use resource::{ResourceInfo, ResourceState};
