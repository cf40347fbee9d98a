//! SQLite-backed plugin store
//!
//! Handles schema bootstrap on open and keeps the resource info the host
//! delivered during initialization.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::core::{PluginResult, ResourceInfo};

/// Current schema version, recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Full schema, applied when the store is first created
pub const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Row key the resource info is stored under
const RESOURCE_INFO_KEY: &str = "resource_info";

/// A forward migration: the SQL that brings the schema up to `version`
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub sql: &'static str,
}

/// Ordered forward migrations, oldest first
pub const MIGRATIONS: &[Migration] = &[];

/// What bootstrap did to the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaAction {
    /// Fresh store, full schema applied
    Applied,
    /// Existing store moved forward
    Migrated { from: i64, to: i64 },
    /// Nothing to do
    UpToDate,
}

/// Plugin store
#[derive(Debug)]
pub struct DataStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl DataStore {
    /// Open (or create) a store at `path` and bootstrap its schema
    pub fn open(path: impl AsRef<Path>) -> PluginResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&path)?;
        let store = Self::from_connection(conn, Some(path))?;
        Ok(store)
    }

    /// Open a throwaway in-memory store
    pub fn open_in_memory() -> PluginResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> PluginResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let store = Self {
            conn: Mutex::new(conn),
            path,
        };
        let action = store.bootstrap()?;
        tracing::info!(
            path = ?store.path,
            ?action,
            "[DataStore] Store opened"
        );
        Ok(store)
    }

    /// Location on disk, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Bring the schema to [`SCHEMA_VERSION`]
    ///
    /// Safe to call repeatedly; runs in one transaction.
    pub fn bootstrap(&self) -> PluginResult<SchemaAction> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let action = bootstrap_schema(&tx, SCHEMA_VERSION, MIGRATIONS)?;
        tx.commit()?;
        Ok(action)
    }

    /// Highest recorded schema version, `None` before bootstrap
    pub fn schema_version(&self) -> PluginResult<Option<i64>> {
        let conn = self.conn();
        let version = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i64>>(0)
        })?;
        Ok(version)
    }

    /// Number of rows in `schema_version`
    pub fn version_row_count(&self) -> PluginResult<i64> {
        let conn = self.conn();
        let count = conn.query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Persist the resource info, replacing any earlier copy
    pub fn save_resource_info(&self, info: &ResourceInfo) -> PluginResult<()> {
        let value = serde_json::to_string(info)?;
        let conn = self.conn();
        conn.execute(
            "INSERT INTO resource_info (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![RESOURCE_INFO_KEY, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Load the persisted resource info, if any
    pub fn load_resource_info(&self) -> PluginResult<Option<ResourceInfo>> {
        let conn = self.conn();
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM resource_info WHERE key = ?1",
                params![RESOURCE_INFO_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match value {
            Some(v) => Ok(Some(serde_json::from_str(&v)?)),
            None => Ok(None),
        }
    }
}

// ============================================================================
// Schema bootstrap
// ============================================================================

fn bootstrap_schema(
    tx: &Transaction<'_>,
    target: i64,
    migrations: &[Migration],
) -> PluginResult<SchemaAction> {
    let exists = tx
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()?
        .is_some();

    if !exists {
        tx.execute_batch(SCHEMA_SQL)?;
        record_version(tx, target)?;
        tracing::info!(version = target, "[DataStore] Schema applied");
        return Ok(SchemaAction::Applied);
    }

    let current: i64 = tx
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i64>>(0)
        })?
        .unwrap_or(0);

    if current >= target {
        return Ok(SchemaAction::UpToDate);
    }

    for step in migrations
        .iter()
        .filter(|m| m.version > current && m.version <= target)
    {
        tracing::info!(version = step.version, "[DataStore] Running migration");
        tx.execute_batch(step.sql)?;
    }
    // Tables added to the schema file since `current` are created here
    tx.execute_batch(SCHEMA_SQL)?;
    record_version(tx, target)?;

    tracing::info!(from = current, to = target, "[DataStore] Schema migrated");
    Ok(SchemaAction::Migrated {
        from: current,
        to: target,
    })
}

fn record_version(tx: &Transaction<'_>, version: i64) -> PluginResult<()> {
    tx.execute(
        "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
        params![version, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}
