use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::Connection;
use tokio::sync::Mutex;
use tracing::info;

use super::{Row, SheetStore};

/// Worksheets kept in a local SQLite file, one table row per sheet row.
#[derive(Clone)]
pub struct SqliteSheetStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSheetStore {
    /// Open or create the SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // journal_mode PRAGMA always returns the resulting mode, so use query_row
        let _: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;

        Self::run_migrations(&conn)?;

        info!("Worksheet store initialized at: {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS sheet_rows (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sheet TEXT NOT NULL,
                cells TEXT NOT NULL,
                appended_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_sheet_rows_sheet
                ON sheet_rows(sheet, id);
            ",
        )
        .context("Failed to create worksheet tables")?;
        Ok(())
    }

    /// Write `header` as the first row of `sheet` if the sheet has no rows yet.
    pub async fn ensure_header(&self, sheet: &str, header: &[&str]) -> Result<()> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row(
            "SELECT count(*) FROM sheet_rows WHERE sheet = ?1",
            rusqlite::params![sheet],
            |row| row.get(0),
        )?;
        if count == 0 {
            let cells = serde_json::to_string(header)?;
            conn.execute(
                "INSERT INTO sheet_rows (sheet, cells) VALUES (?1, ?2)",
                rusqlite::params![sheet, cells],
            )
            .with_context(|| format!("Failed to write header for worksheet {}", sheet))?;
            info!("Created header row for worksheet {}", sheet);
        }
        Ok(())
    }
}

#[async_trait]
impl SheetStore for SqliteSheetStore {
    async fn get_all_rows(&self, sheet: &str) -> Result<Vec<Row>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT cells FROM sheet_rows WHERE sheet = ?1 ORDER BY id")?;
        let encoded = stmt
            .query_map(rusqlite::params![sheet], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to read worksheet {}", sheet))?;

        encoded
            .iter()
            .map(|cells| {
                serde_json::from_str::<Row>(cells)
                    .with_context(|| format!("Corrupt row in worksheet {}", sheet))
            })
            .collect()
    }

    async fn append_row(&self, sheet: &str, row: &[String]) -> Result<()> {
        let cells = serde_json::to_string(row)?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO sheet_rows (sheet, cells) VALUES (?1, ?2)",
            rusqlite::params![sheet, cells],
        )
        .with_context(|| format!("Failed to append to worksheet {}", sheet))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_append_and_read_in_order() {
        let store = SqliteSheetStore::open_in_memory().unwrap();
        store.append_row("Daily", &cells(&["", "A", "20001"])).await.unwrap();
        store.append_row("Daily", &cells(&["", "B", "20002"])).await.unwrap();

        let rows = store.get_all_rows("Daily").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][1], "A");
        assert_eq!(rows[1][2], "20002");
    }

    #[tokio::test]
    async fn test_sheets_are_independent() {
        let store = SqliteSheetStore::open_in_memory().unwrap();
        store.append_row("Daily", &cells(&["", "A", "20001"])).await.unwrap();

        assert!(store.get_all_rows("Monthly").await.unwrap().is_empty());
        assert_eq!(store.get_all_rows("Daily").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_header_only_on_empty_sheet() {
        let store = SqliteSheetStore::open_in_memory().unwrap();
        store.ensure_header("Daily", &["no", "branch", "code"]).await.unwrap();
        store.ensure_header("Daily", &["other"]).await.unwrap();

        let rows = store.get_all_rows("Daily").await.unwrap();
        assert_eq!(rows, vec![cells(&["no", "branch", "code"])]);
    }

    #[tokio::test]
    async fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheets.db");
        {
            let store = SqliteSheetStore::open(&path).unwrap();
            store.append_row("Monthly", &cells(&["", "A", "P60001"])).await.unwrap();
        }

        let reopened = SqliteSheetStore::open(&path).unwrap();
        let rows = reopened.get_all_rows("Monthly").await.unwrap();
        assert_eq!(rows[0][2], "P60001");
    }
}
