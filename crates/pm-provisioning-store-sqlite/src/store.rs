// pm-provisioning-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Provisioning State Store
// Description: Durable ProvisioningStateStore backed by SQLite.
// Purpose: Persist provisioning attempt rows across restarts.
// Dependencies: pm-provisioning-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This module implements [`ProvisioningStateStore`] on top of `SQLite`. Each
//! provisioning attempt is one row in `provisioning_states`; the row with the
//! highest id is the latest state. Stored status labels are parsed strictly
//! and unknown labels fail closed as corruption.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use pm_provisioning_core::ProvisioningState;
use pm_provisioning_core::ProvisioningStateStore;
use pm_provisioning_core::ProvisioningStatus;
use pm_provisioning_core::StoreError;
use pm_provisioning_core::Timestamp;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` provisioning state store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a configuration for `path` with default pragmas.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error, Clone)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored row could not be interpreted.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data or configuration.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

/// Maps a `SQLite` engine error into a store error.
#[allow(clippy::needless_pass_by_value, reason = "Used directly as a map_err adapter.")]
fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed provisioning state store.
///
/// # Invariants
/// - Connection access is serialized through a mutex.
/// - Row ids are assigned by `SQLite` and strictly increase.
#[derive(Clone)]
pub struct SqliteProvisioningStateStore {
    /// Shared connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteProvisioningStateStore {
    /// Opens an `SQLite`-backed provisioning state store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path is rejected or the database
    /// cannot be opened or initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        check_state_path(&config.path)?;
        create_state_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Verifies the store can execute a simple SQL statement.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] if the mutex is poisoned or the query fails.
    pub fn readiness(&self) -> Result<(), SqliteStoreError> {
        let guard = self.lock()?;
        guard.execute_batch("SELECT 1;").map_err(db_error)
    }

    /// Returns every stored row in id order.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails or a row is corrupt.
    pub fn list_states(&self) -> Result<Vec<ProvisioningState>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT id, state, provisioning_start_time, provisioning_end_time
                 FROM provisioning_states ORDER BY id ASC",
            )
            .map_err(db_error)?;
        let rows = statement.query_map(params![], read_row).map_err(db_error)?;
        let mut states = Vec::new();
        for row in rows {
            states.push(decode_row(row.map_err(db_error)?)?);
        }
        Ok(states)
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite connection mutex poisoned".to_string()))
    }

    /// Loads the row with the highest id.
    fn load_latest(&self) -> Result<Option<ProvisioningState>, SqliteStoreError> {
        let guard = self.lock()?;
        let row = guard
            .query_row(
                "SELECT id, state, provisioning_start_time, provisioning_end_time
                 FROM provisioning_states ORDER BY id DESC LIMIT 1",
                params![],
                read_row,
            )
            .optional()
            .map_err(db_error)?;
        drop(guard);
        row.map(decode_row).transpose()
    }

    /// Inserts a new row.
    fn insert_row(
        &self,
        state: ProvisioningStatus,
        started_at: Timestamp,
    ) -> Result<ProvisioningState, SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO provisioning_states (state, provisioning_start_time) VALUES (?1, ?2)",
                params![state.as_str(), started_at.as_unix_millis()],
            )
            .map_err(db_error)?;
        let id = guard.last_insert_rowid();
        drop(guard);
        Ok(ProvisioningState {
            id: decode_id(id)?,
            state,
            provisioning_start_time: Some(started_at),
            provisioning_end_time: None,
        })
    }

    /// Overwrites the state and times of an existing row.
    fn update_row(&self, state: &ProvisioningState) -> Result<(), SqliteStoreError> {
        let id = i64::try_from(state.id)
            .map_err(|_| SqliteStoreError::Invalid(format!("row id out of range: {}", state.id)))?;
        let guard = self.lock()?;
        let updated = guard
            .execute(
                "UPDATE provisioning_states
                 SET state = ?1, provisioning_start_time = ?2, provisioning_end_time = ?3
                 WHERE id = ?4",
                params![
                    state.state.as_str(),
                    state.provisioning_start_time.map(Timestamp::as_unix_millis),
                    state.provisioning_end_time.map(Timestamp::as_unix_millis),
                    id
                ],
            )
            .map_err(db_error)?;
        drop(guard);
        if updated == 0 {
            return Err(SqliteStoreError::Invalid(format!(
                "provisioning state {} not found",
                state.id
            )));
        }
        Ok(())
    }
}

impl ProvisioningStateStore for SqliteProvisioningStateStore {
    fn find_latest(&self) -> Result<Option<ProvisioningState>, StoreError> {
        self.load_latest().map_err(StoreError::from)
    }

    fn insert(
        &self,
        state: ProvisioningStatus,
        started_at: Timestamp,
    ) -> Result<ProvisioningState, StoreError> {
        self.insert_row(state, started_at).map_err(StoreError::from)
    }

    fn update(&self, state: &ProvisioningState) -> Result<(), StoreError> {
        self.update_row(state).map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Raw column values of one `provisioning_states` row.
struct StateRow {
    /// Row id.
    id: i64,
    /// Status label.
    state: String,
    /// Start time in unix millis.
    start: Option<i64>,
    /// End time in unix millis.
    end: Option<i64>,
}

/// Reads the raw columns of a row.
fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StateRow> {
    Ok(StateRow {
        id: row.get(0)?,
        state: row.get(1)?,
        start: row.get(2)?,
        end: row.get(3)?,
    })
}

/// Converts raw columns into a provisioning state.
fn decode_row(row: StateRow) -> Result<ProvisioningState, SqliteStoreError> {
    let state = ProvisioningStatus::parse(&row.state).ok_or_else(|| {
        SqliteStoreError::Corrupt(format!("unknown provisioning state label: {}", row.state))
    })?;
    Ok(ProvisioningState {
        id: decode_id(row.id)?,
        state,
        provisioning_start_time: row.start.map(Timestamp::from_unix_millis),
        provisioning_end_time: row.end.map(Timestamp::from_unix_millis),
    })
}

/// Converts a stored row id into a provisioning state id.
fn decode_id(id: i64) -> Result<u64, SqliteStoreError> {
    u64::try_from(id).map_err(|_| SqliteStoreError::Corrupt(format!("negative row id: {id}")))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Metadata table holding the schema version.
const META_DDL: &str = "CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);";

/// Provisioning attempt table; the highest id is the latest attempt.
const STATES_DDL: &str = "CREATE TABLE IF NOT EXISTS provisioning_states (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    state TEXT NOT NULL,
    provisioning_start_time INTEGER,
    provisioning_end_time INTEGER
);";

/// Rejects state database paths that are empty, oversized, or directories.
fn check_state_path(path: &Path) -> Result<(), SqliteStoreError> {
    let invalid = |reason: &str| Err(SqliteStoreError::Invalid(format!("state db path {reason}")));
    if path.as_os_str().is_empty() {
        return invalid("is empty");
    }
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return invalid("is too long");
    }
    if path.components().any(|part| part.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH) {
        return invalid("has a component that is too long");
    }
    if path.is_dir() {
        return invalid("points at a directory");
    }
    Ok(())
}

/// Creates the directory that will hold the state database.
fn create_state_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let dir = path
        .parent()
        .ok_or_else(|| SqliteStoreError::Io("state db path has no parent directory".to_string()))?;
    std::fs::create_dir_all(dir).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Opens the state database and applies journal, sync, and busy settings.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    let pragmas = [
        ("journal_mode", config.journal_mode.pragma_value()),
        ("synchronous", config.sync_mode.pragma_value()),
    ];
    for (pragma, value) in pragmas {
        connection.execute_batch(&format!("PRAGMA {pragma} = {value};")).map_err(db_error)?;
    }
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(db_error)?;
    Ok(connection)
}

/// Creates the schema on first open, otherwise checks the stored version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db_error)?;
    tx.execute_batch(META_DDL).map_err(db_error)?;
    let stored: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    match stored {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_error)?;
            tx.execute_batch(STATES_DDL).map_err(db_error)?;
        }
        Some(SCHEMA_VERSION) => {}
        Some(found) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "state db schema version {found} is not {SCHEMA_VERSION}"
            )));
        }
    }
    tx.commit().map_err(db_error)
}
