use crate::error::Result;
use rusqlite::{params, Connection};
use std::path::Path;

/// Owns the single SQLite connection for a pipeline run.
///
/// Opened once at the start of a run and released when dropped; all
/// loaders borrow the connection for the scope of their transaction.
pub struct DatabaseManager {
    conn: Connection,
}

impl DatabaseManager {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        Self::bootstrap(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA foreign_keys=ON;
            CREATE TABLE IF NOT EXISTS etl_fetch_log (
                source_id        TEXT PRIMARY KEY,
                last_fetched_at  INTEGER NOT NULL,
                payload_sha256   TEXT
            );
            "#,
        )?;
        Ok(Self { conn })
    }

    pub fn connection(&mut self) -> &mut Connection {
        &mut self.conn
    }

    // Fetch ledger: per-source bookkeeping of the last download.
    // Informational only; never consulted to block a load.

    pub fn get_last_fetch(&self, source_id: &str) -> Result<Option<(i64, Option<String>)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT last_fetched_at, payload_sha256 FROM etl_fetch_log WHERE source_id = ?1")?;
        let mut rows = stmt.query(params![source_id])?;
        if let Some(row) = rows.next()? {
            let ts: i64 = row.get(0)?;
            let sha: Option<String> = row.get(1)?;
            Ok(Some((ts, sha)))
        } else {
            Ok(None)
        }
    }

    pub fn record_fetch(&self, source_id: &str, ts: i64, payload_sha256: Option<&str>) -> Result<()> {
        self.conn.execute(
            "INSERT INTO etl_fetch_log (source_id, last_fetched_at, payload_sha256) VALUES (?1, ?2, ?3)
             ON CONFLICT(source_id) DO UPDATE SET
                 last_fetched_at=excluded.last_fetched_at,
                 payload_sha256=excluded.payload_sha256",
            params![source_id, ts, payload_sha256],
        )?;
        Ok(())
    }
}
