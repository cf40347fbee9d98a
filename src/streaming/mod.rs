//! Streaming session management: input channels and output subscribers

pub mod session;

pub use session::{open_stream, RelayReport, StreamSessions};
