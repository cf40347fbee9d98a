//! Plugin error types

use thiserror::Error;

use super::payload::ChannelId;

/// Errors that can occur inside the plugin
#[derive(Error, Debug)]
pub enum PluginError {
    /// No invokable is registered under this name
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Command payload could not be decoded
    #[error("Malformed command: {0}")]
    MalformedCommand(String),

    /// A cancellable task is already registered for this channel
    #[error("Task already running on channel {0}")]
    TaskAlreadyRunning(ChannelId),

    /// A resource the handler depends on has not been delivered yet
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// The plugin has not been initialized (or was uninitialized)
    #[error("Plugin not initialized")]
    NotInitialized,

    /// Host channel closed unexpectedly
    #[error("Channel closed")]
    ChannelClosed,

    /// Send error towards the host
    #[error("Failed to send payload: {0}")]
    SendError(String),

    /// Persistent store error
    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Language-model call failed
    #[error("Model error: {0}")]
    Model(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl PluginError {
    /// Create a generic error from a string
    pub fn other(msg: impl Into<String>) -> Self {
        PluginError::Other(msg.into())
    }

    /// Create a malformed-command error
    pub fn malformed(msg: impl Into<String>) -> Self {
        PluginError::MalformedCommand(msg.into())
    }
}

/// Result type alias for plugin operations
pub type PluginResult<T> = Result<T, PluginError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PluginError::UnknownCommand("frobnicate".into());
        assert_eq!(err.to_string(), "Unknown command: frobnicate");

        let err = PluginError::TaskAlreadyRunning(7);
        assert_eq!(err.to_string(), "Task already running on channel 7");

        let err = PluginError::ChannelClosed;
        assert_eq!(err.to_string(), "Channel closed");
    }

    #[test]
    fn test_error_from_serde() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: PluginError = json_err.into();
        assert!(matches!(err, PluginError::Serialization(_)));
    }
}
