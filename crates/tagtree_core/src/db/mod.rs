//! Settings database.
//!
//! # Responsibility
//! - Open the SQLite file that holds application settings.
//! - Bring its schema up to date and seed default rows on creation.
//!
//! # Invariants
//! - The schema version lives in `PRAGMA user_version`.
//! - A database written by a newer build is refused, never downgraded.
//!
//! # See also
//! - `repo::settings_repo` for typed access.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use migrations::{schema_state, SchemaState, SCHEMA_VERSION};
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// A schema step failed; none of the pending steps were committed.
    Migration {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
    /// The settings file was written by a newer build.
    SchemaTooNew { found: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Migration {
                version,
                name,
                source,
            } => write!(f, "settings schema step {version} ({name}) failed: {source}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "settings schema version {found} is newer than supported {supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
