pub mod core;
pub mod config;
pub mod host;
pub mod plugin;

// Command dispatch and the built-in commands
pub mod dispatch;
pub mod handlers;
pub mod invokable;

// Long-running work and streaming
pub mod cancellation;
pub mod streaming;

// External collaborators
pub mod llm;
pub mod store;

// Optional components
pub mod cli;
pub mod logging;
