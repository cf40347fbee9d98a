//! Persistent plugin state

pub mod data_store;

pub use data_store::{DataStore, Migration, SchemaAction, MIGRATIONS, SCHEMA_VERSION};
