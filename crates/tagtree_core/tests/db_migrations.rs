use rusqlite::Connection;
use tagtree_core::db::{
    open_db, open_db_in_memory, schema_state, DbError, SchemaState, SCHEMA_VERSION,
};
use tagtree_core::{Settings, SettingsRepoError, SettingsRepository, SqliteSettingsRepository};

#[test]
fn fresh_database_is_current_and_seeded() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_state(&conn).unwrap(), SchemaState::Current);
    assert_eq!(stored_value(&conn, "backup_on_any_change"), Some("false".to_string()));
    assert_eq!(stored_value(&conn, "log_level"), None);

    let repo = SqliteSettingsRepository::try_new(&conn).unwrap();
    assert_eq!(repo.load().unwrap(), Settings::default());
}

#[test]
fn reopening_keeps_stored_settings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.db");

    {
        let conn = open_db(&path).unwrap();
        let repo = SqliteSettingsRepository::try_new(&conn).unwrap();
        repo.save(&Settings {
            backup_on_any_change: true,
            ..Settings::default()
        })
        .unwrap();
    }

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_state(&conn).unwrap(), SchemaState::Current);
    assert_eq!(stored_value(&conn, "backup_on_any_change"), Some("true".to_string()));
}

#[test]
fn upgrade_from_first_schema_keeps_user_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("old.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(include_str!("../src/db/migrations/0001_settings.sql"))
        .unwrap();
    conn.execute_batch(
        "INSERT INTO settings (key, value) VALUES ('backup_on_any_change', 'true');
         PRAGMA user_version = 1;",
    )
    .unwrap();
    assert_eq!(
        schema_state(&conn).unwrap(),
        SchemaState::Outdated { found: 1 }
    );
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_state(&conn).unwrap(), SchemaState::Current);
    let repo = SqliteSettingsRepository::try_new(&conn).unwrap();
    assert!(repo.load().unwrap().backup_on_any_change);
}

#[test]
fn newer_schema_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    assert!(matches!(
        SqliteSettingsRepository::try_new(&conn),
        Err(SettingsRepoError::UninitializedConnection {
            actual_version: 999,
            ..
        })
    ));
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::SchemaTooNew { found, supported } => {
            assert_eq!(found, 999);
            assert_eq!(supported, SCHEMA_VERSION);
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn stored_value(conn: &Connection, key: &str) -> Option<String> {
    let mut stmt = conn
        .prepare("SELECT value FROM settings WHERE key = ?1;")
        .unwrap();
    let mut rows = stmt.query([key]).unwrap();
    let value = rows.next().unwrap().map(|row| row.get(0).unwrap());
    value
}
