//! Host boundary
//!
//! The host owns channel allocation, payload transport and callback
//! registration. The plugin only talks to it through [`HostInterface`]:
//! - `HostInterface` - Outbound contract the plugin calls into
//! - `LocalHost` - In-process host used by tests and the demo console
//!
//! Commands addressed to [`HOST_TARGET`] are served by the host itself
//! rather than routed to a plugin.

pub mod interface;
pub mod local;

pub use interface::{callback, HostInterface, PayloadCallback};
pub use local::{HostConfig, HostMessage, LocalHost};

/// Name used in `InvokeCommand::to` to address the host itself
pub const HOST_TARGET: &str = "host";
