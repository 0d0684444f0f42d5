//! SQLite connection setup and schema migrations for [`super::SqliteStore`].

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, Result as SqlResult};

/// Bumped whenever [`MIGRATIONS`] gains an entry.
pub const SCHEMA_VERSION: i64 = 1;

/// How long a writer waits on a locked file before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Migration `i` moves the file from `user_version` `i` to `i + 1`.
const MIGRATIONS: [&str; 1] = [r#"
    CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        conversation_id TEXT NOT NULL,
        sender_id TEXT,
        receiver_id TEXT,
        text TEXT,
        timestamp INTEGER,
        is_read INTEGER NOT NULL DEFAULT 0
    );
    CREATE TABLE IF NOT EXISTS conversations (
        id TEXT PRIMARY KEY,
        participant_a TEXT NOT NULL,
        participant_b TEXT NOT NULL,
        listing_id TEXT,
        last_message TEXT,
        last_message_at INTEGER
    );
    CREATE INDEX IF NOT EXISTS idx_messages_conversation_timestamp
        ON messages(conversation_id, timestamp);
"#];

/// Opens the store file in WAL mode and brings its schema up to date.
pub fn open_file(path: &Path) -> SqlResult<Connection> {
    let mut conn = Connection::open(path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    if !mode.eq_ignore_ascii_case("wal") {
        log::warn!("SQLite refused WAL mode for {}; using {mode}", path.display());
    }
    migrate(&mut conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> SqlResult<Connection> {
    let mut conn = Connection::open_in_memory()?;
    migrate(&mut conn)?;
    Ok(conn)
}

pub fn schema_version(conn: &Connection) -> SqlResult<i64> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
}

/// Applies every migration past the file's `user_version`, each in its own
/// transaction.
fn migrate(conn: &mut Connection) -> SqlResult<()> {
    let current = schema_version(conn)?;
    if current > SCHEMA_VERSION {
        log::warn!("Store schema v{current} is newer than this client (v{SCHEMA_VERSION})");
        return Ok(());
    }
    for (version, sql) in MIGRATIONS.iter().enumerate().skip(current as usize) {
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version as i64 + 1)?;
        tx.commit()?;
        log::debug!("Migrated store schema to v{}", version + 1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        stmt.query_map([], |row| row.get(0))
            .unwrap()
            .collect::<SqlResult<_>>()
            .unwrap()
    }

    #[test]
    fn fresh_database_gets_current_schema() {
        let conn = open_in_memory().unwrap();
        assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert_eq!(table_names(&conn), ["conversations", "messages"]);
    }

    #[test]
    fn reopening_a_file_keeps_rows_and_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        {
            let conn = open_file(&path).unwrap();
            conn.execute(
                "INSERT INTO messages (id, conversation_id) VALUES ('m1', 'c1')",
                [],
            )
            .unwrap();
        }

        let conn = open_file(&path).unwrap();
        let mode: String = conn
            .pragma_query_value(None, "journal_mode", |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
        assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn newer_schema_is_left_alone() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .unwrap();
        migrate(&mut conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION + 1);
        assert!(table_names(&conn).is_empty());
    }
}
