//! SQLite persistence for list aggregates.
//!
//! Runtime defaults are intentionally conservative:
//! - `journal_mode = WAL` to allow concurrent readers while a writer commits
//! - `busy_timeout = 5s` to reduce transient lock failures under contention
//! - `foreign_keys = ON` to protect relational integrity across the
//!   decomposed aggregate tables
//!
//! Writes go through [`Store::save_list`], which enforces the optimistic
//! `version` check; cross-process serialization of a whole load-mutate-save
//! span is the job of [`crate::lock::ListLock`].

pub mod migrations;
pub mod schema;

mod aggregate;
mod numbering;

use anyhow::Context as _;
use rusqlite::Connection;
use std::{path::Path, time::Duration};
use thiserror::Error;

use crate::error::ErrorCode;
use crate::model::ids::ListId;
use crate::model::number::BlankCustomerName;

/// Busy timeout used for store connections.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Error returned by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The stored row changed (or vanished) since this aggregate was loaded.
    #[error("version conflict on list '{list_id}': expected stored version {expected}")]
    VersionConflict { list_id: ListId, expected: u64 },

    /// A stored enum string, JSON payload, or timestamp failed to parse.
    #[error("corrupt stored record: {what}")]
    Corrupt { what: String },

    /// The customer display name is blank; it can neither head a saved list
    /// nor yield a number prefix.
    #[error(transparent)]
    BlankCustomerName(#[from] BlankCustomerName),

    /// Opening, configuring, or migrating the database failed.
    #[error("store setup failed: {0}")]
    Setup(#[source] anyhow::Error),

    /// A SQLite statement failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Serializing aggregate state to JSON failed.
    #[error("JSON encode error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Machine-readable code associated with this store error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::VersionConflict { .. } => ErrorCode::VersionConflict,
            Self::Corrupt { .. } => ErrorCode::CorruptRecord,
            Self::BlankCustomerName(_) => ErrorCode::BlankCustomerName,
            Self::Setup(_) | Self::Sqlite(_) | Self::Json(_) => ErrorCode::StorageFailed,
        }
    }
}

pub(crate) fn corrupt(what: impl Into<String>) -> StoreError {
    StoreError::Corrupt { what: what.into() }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Handle to the list store database.
///
/// One `Store` wraps one SQLite connection; it is not `Sync`. Processes that
/// work on the same file coordinate through SQLite's own locking plus the
/// advisory locks in [`crate::lock`].
#[derive(Debug)]
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the store at `path`, apply runtime pragmas, and
    /// migrate the schema to the latest version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Setup`] if opening, configuring, or migrating
    /// the database fails.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let open = || -> anyhow::Result<Connection> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create store directory {}", parent.display()))?;
            }

            let mut conn = Connection::open(path)
                .with_context(|| format!("open store database {}", path.display()))?;

            configure_connection(&conn).context("configure sqlite pragmas")?;
            migrations::migrate(&mut conn).context("apply store migrations")?;
            Ok(conn)
        };

        let conn = open().map_err(StoreError::Setup)?;
        Ok(Self { conn })
    }
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    let _journal_mode: String =
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
    Ok(())
}
