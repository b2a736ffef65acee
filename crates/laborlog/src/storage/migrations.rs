//! Database migration system for laborlog.
//!
//! The schema version lives in the `metadata` table. Base tables are created
//! idempotently on every open; numbered migrations then bring older databases
//! forward.

use rusqlite::Connection;

use crate::error::{Error, Result};

use super::schema::{CREATE_SINGLE_PRIMARY_INDEX, SCHEMA_STATEMENTS};

/// The current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// Initialize the database schema.
///
/// Creates all tables and indexes if they don't exist, then runs any
/// pending migrations to bring the schema up to the current version.
///
/// # Errors
///
/// Returns an error if schema creation or migration fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        conn.execute(statement, [])?;
    }

    let version = get_schema_version(conn)?;
    if version < CURRENT_VERSION {
        run_migrations(conn, version)?;
    }

    Ok(())
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (fresh database).
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<String, rusqlite::Error> = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get(0),
    );

    match result {
        Ok(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

/// Run migrations from the given version to the current version.
fn run_migrations(conn: &Connection, from_version: i32) -> Result<()> {
    let mut current = from_version;

    while current < CURRENT_VERSION {
        current += 1;
        run_migration(conn, current)?;
        set_schema_version(conn, current)?;
    }

    Ok(())
}

/// Run a specific migration version.
fn run_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => Ok(()),
        2 => migrate_v2(conn),
        _ => Err(Error::DatabaseMigration {
            message: format!("unknown migration version: {version}"),
        }),
    }
}

/// Migration to version 2: at most one primary hospital.
///
/// Keeps the most recently updated primary and demotes the rest before the
/// unique index is created.
fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute(
        r"
        UPDATE hospitals SET is_primary = 0
        WHERE is_primary = 1 AND id NOT IN (
            SELECT id FROM hospitals WHERE is_primary = 1
            ORDER BY updated_at DESC, id DESC LIMIT 1
        )
        ",
        [],
    )?;
    conn.execute(CREATE_SINGLE_PRIMARY_INDEX, [])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_db() -> Connection {
        Connection::open_in_memory().expect("failed to create in-memory database")
    }

    fn table_exists(conn: &Connection, name: &str) -> bool {
        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [name],
                |row| row.get(0),
            )
            .unwrap();
        count == 1
    }

    #[test]
    fn test_initialize_schema_creates_tables() {
        let conn = create_test_db();
        initialize_schema(&conn).expect("failed to initialize schema");

        assert!(table_exists(&conn, "contractions"));
        assert!(table_exists(&conn, "hospitals"));
        assert!(table_exists(&conn, "metadata"));
    }

    #[test]
    fn test_initialize_schema_sets_version() {
        let conn = create_test_db();
        initialize_schema(&conn).expect("failed to initialize schema");

        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_initialize_schema_idempotent() {
        let conn = create_test_db();

        initialize_schema(&conn).expect("first init failed");
        initialize_schema(&conn).expect("second init failed");

        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_get_schema_version_fresh_db() {
        let conn = create_test_db();
        conn.execute(
            "CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )
        .unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), 0);
    }

    #[test]
    fn test_run_migration_unknown_version() {
        let conn = create_test_db();
        initialize_schema(&conn).unwrap();

        let err = run_migration(&conn, 999).unwrap_err();
        assert!(err.to_string().contains("unknown migration version"));
    }

    #[test]
    fn test_v2_demotes_duplicate_primaries() {
        let conn = create_test_db();
        for statement in SCHEMA_STATEMENTS {
            conn.execute(statement, []).unwrap();
        }
        set_schema_version(&conn, 1).unwrap();

        // Two primaries left behind by an older version.
        conn.execute_batch(
            r"
            INSERT INTO hospitals (name, phone_number, is_primary, created_at, updated_at)
            VALUES ('Old', '1', 1, '2024-01-01T00:00:00.000Z', '2024-01-01T00:00:00.000Z');
            INSERT INTO hospitals (name, phone_number, is_primary, created_at, updated_at)
            VALUES ('New', '2', 1, '2024-02-01T00:00:00.000Z', '2024-02-01T00:00:00.000Z');
            ",
        )
        .unwrap();

        initialize_schema(&conn).unwrap();

        let primary: String = conn
            .query_row("SELECT name FROM hospitals WHERE is_primary = 1", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(primary, "New");
        assert_eq!(get_schema_version(&conn).unwrap(), 2);
    }

    #[test]
    fn test_single_primary_index_rejects_second_primary() {
        let conn = create_test_db();
        initialize_schema(&conn).unwrap();

        let insert = r"
            INSERT INTO hospitals (name, phone_number, is_primary, created_at, updated_at)
            VALUES (?1, '555', 1, '2024-01-01T00:00:00.000Z', '2024-01-01T00:00:00.000Z')
        ";
        conn.execute(insert, ["A"]).unwrap();
        assert!(conn.execute(insert, ["B"]).is_err());
    }

    #[test]
    fn test_indexes_created() {
        let conn = create_test_db();
        initialize_schema(&conn).expect("failed to initialize schema");

        let indexes: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='index'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(indexes.iter().any(|n| n.contains("start_time")));
        assert!(indexes.iter().any(|n| n.contains("hospitals_order")));
        assert!(indexes.iter().any(|n| n.contains("single_primary")));
    }
}
