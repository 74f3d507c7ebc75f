//! Settings repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Load and store [`Settings`] as key/value rows.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Connections must be migrated to the latest schema before use.
//! - Unknown keys are ignored; malformed values are reported, never defaulted.

use crate::db::{schema_state, DbError, SchemaState, SCHEMA_VERSION};
use crate::logging::parse_level;
use crate::model::settings::Settings;
use rusqlite::{params, Connection};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

const KEY_BACKUP_ON_ANY_CHANGE: &str = "backup_on_any_change";
const KEY_LOG_LEVEL: &str = "log_level";
const KEY_LAST_LIBRARY_PATH: &str = "last_library_path";

pub type SettingsRepoResult<T> = Result<T, SettingsRepoError>;

#[derive(Debug)]
pub enum SettingsRepoError {
    Db(DbError),
    /// Connection schema version does not match this binary.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    InvalidData(String),
}

impl Display for SettingsRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "settings connection is at schema version {actual_version}, expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table missing: {table}"),
            Self::InvalidData(message) => write!(f, "invalid persisted settings data: {message}"),
        }
    }
}

impl Error for SettingsRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for SettingsRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SettingsRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for application settings.
pub trait SettingsRepository {
    /// Loads settings, filling absent keys with defaults.
    fn load(&self) -> SettingsRepoResult<Settings>;
    /// Stores every setting; absent optional values remove their row.
    fn save(&self, settings: &Settings) -> SettingsRepoResult<()>;
}

/// SQLite-backed settings repository.
pub struct SqliteSettingsRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSettingsRepository<'conn> {
    /// Creates a repository after checking the connection schema.
    pub fn try_new(conn: &'conn Connection) -> SettingsRepoResult<Self> {
        ensure_settings_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl SettingsRepository for SqliteSettingsRepository<'_> {
    fn load(&self) -> SettingsRepoResult<Settings> {
        let mut settings = Settings::default();
        let mut stmt = self.conn.prepare("SELECT key, value FROM settings;")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            match key.as_str() {
                KEY_BACKUP_ON_ANY_CHANGE => {
                    settings.backup_on_any_change = parse_bool(&key, &value)?;
                }
                KEY_LOG_LEVEL => {
                    settings.log_level = parse_level(&value)
                        .map_err(SettingsRepoError::InvalidData)?
                        .to_string();
                }
                KEY_LAST_LIBRARY_PATH => {
                    settings.last_library_path = Some(PathBuf::from(value));
                }
                _ => {}
            }
        }
        Ok(settings)
    }

    fn save(&self, settings: &Settings) -> SettingsRepoResult<()> {
        let log_level = parse_level(&settings.log_level).map_err(SettingsRepoError::InvalidData)?;
        let tx = self.conn.unchecked_transaction()?;
        upsert(&tx, KEY_BACKUP_ON_ANY_CHANGE, bool_to_db(settings.backup_on_any_change))?;
        upsert(&tx, KEY_LOG_LEVEL, log_level)?;
        match &settings.last_library_path {
            Some(path) => {
                let value = path.to_str().ok_or_else(|| {
                    SettingsRepoError::InvalidData(format!(
                        "library path is not valid UTF-8: {}",
                        path.display()
                    ))
                })?;
                upsert(&tx, KEY_LAST_LIBRARY_PATH, value)?;
            }
            None => {
                tx.execute(
                    "DELETE FROM settings WHERE key = ?1;",
                    [KEY_LAST_LIBRARY_PATH],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn upsert(conn: &Connection, key: &str, value: &str) -> SettingsRepoResult<()> {
    conn.execute(
        "INSERT INTO settings (key, value, updated_at)
         VALUES (?1, ?2, strftime('%s', 'now'))
         ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at;",
        params![key, value],
    )?;
    Ok(())
}

fn parse_bool(key: &str, value: &str) -> SettingsRepoResult<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(SettingsRepoError::InvalidData(format!(
            "{key} must be true|false, got `{other}`"
        ))),
    }
}

fn bool_to_db(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn ensure_settings_connection_ready(conn: &Connection) -> SettingsRepoResult<()> {
    match schema_state(conn)? {
        SchemaState::Current => {}
        SchemaState::Outdated { found } | SchemaState::TooNew { found } => {
            return Err(SettingsRepoError::UninitializedConnection {
                expected_version: SCHEMA_VERSION,
                actual_version: found,
            })
        }
    }

    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'settings'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(SettingsRepoError::MissingRequiredTable("settings"));
    }
    Ok(())
}
