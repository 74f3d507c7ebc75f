//! Settings schema steps.
//!
//! Each step raises `user_version` by one. Steps after the table exists only
//! add rows with `INSERT OR IGNORE`, so values a user stored survive upgrades.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;
use std::cmp::Ordering;

struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const STEPS: &[SchemaStep] = &[
    SchemaStep {
        version: 1,
        name: "settings_table",
        sql: include_str!("0001_settings.sql"),
    },
    SchemaStep {
        version: 2,
        name: "seed_defaults",
        sql: include_str!("0002_seed_defaults.sql"),
    },
];

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = STEPS[STEPS.len() - 1].version;

/// How a connection's schema relates to [`SCHEMA_VERSION`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    Current,
    Outdated { found: u32 },
    TooNew { found: u32 },
}

/// Reads the schema version of `conn`.
pub fn schema_state(conn: &Connection) -> DbResult<SchemaState> {
    let found: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    Ok(match found.cmp(&SCHEMA_VERSION) {
        Ordering::Equal => SchemaState::Current,
        Ordering::Less => SchemaState::Outdated { found },
        Ordering::Greater => SchemaState::TooNew { found },
    })
}

/// Runs every pending step in one transaction.
pub fn upgrade(conn: &mut Connection) -> DbResult<()> {
    let found = match schema_state(conn)? {
        SchemaState::Current => return Ok(()),
        SchemaState::TooNew { found } => {
            return Err(DbError::SchemaTooNew {
                found,
                supported: SCHEMA_VERSION,
            })
        }
        SchemaState::Outdated { found } => found,
    };

    let tx = conn.transaction()?;
    for step in STEPS.iter().filter(|step| step.version > found) {
        tx.execute_batch(step.sql)
            .and_then(|()| tx.pragma_update(None, "user_version", step.version))
            .map_err(|source| DbError::Migration {
                version: step.version,
                name: step.name,
                source,
            })?;
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from={} to={}",
        found, SCHEMA_VERSION
    );
    Ok(())
}
