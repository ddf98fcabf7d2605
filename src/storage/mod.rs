#[cfg(test)]
pub(crate) mod fixtures;
pub mod schema;

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rusqlite::OpenFlags;

use crate::error::{Error, Result};
use crate::query::period::Period;

/// A bounded set of read-only connections to the analytics store, handed out
/// round-robin. The pipeline never writes; schema bootstrap goes through
/// [`Database::init_at`].
#[derive(Clone)]
pub struct Database {
    readers: Arc<Vec<tokio_rusqlite::Connection>>,
    next: Arc<AtomicUsize>,
    timeout: Duration,
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

impl Database {
    /// Open `pool_size` read-only connections at `path` and check each with
    /// `SELECT 1`. Any failure within `timeout` is a connectivity error.
    pub async fn open_at(
        path: impl AsRef<Path>,
        pool_size: usize,
        timeout: Duration,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let pool_size = pool_size.max(1);

        let open = async {
            let mut readers = Vec::with_capacity(pool_size);
            for _ in 0..pool_size {
                let conn = tokio_rusqlite::Connection::open_with_flags(
                    &path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )
                .await
                .map_err(|e| Error::DatabaseUnavailable(format!("{}: {e}", path.display())))?;
                Self::init_reader(&conn).await?;
                readers.push(conn);
            }
            Ok::<Vec<tokio_rusqlite::Connection>, Error>(readers)
        };

        let readers = tokio::time::timeout(timeout, open)
            .await
            .map_err(|_| Error::DatabaseUnavailable(format!("timed out opening {}", path.display())))??;

        log::info!("Opened {} with {} connection(s)", path.display(), readers.len());
        Ok(Self::from_connections(readers, timeout))
    }

    /// Create or migrate the store at `path` and add the per-month columns for
    /// `periods`. Returns the number of columns added.
    pub async fn init_at(path: impl AsRef<Path>, periods: Vec<Period>) -> Result<usize> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let conn = tokio_rusqlite::Connection::open(&path).await?;
        Self::init_writer(&conn, periods).await
    }

    /// Open an in-memory database with the schema applied (for testing).
    pub async fn open_memory(periods: Vec<Period>) -> Result<Self> {
        let conn = tokio_rusqlite::Connection::open_in_memory().await?;
        Self::init_writer(&conn, periods).await?;
        Ok(Self::from_connections(vec![conn], DEFAULT_TIMEOUT))
    }

    fn from_connections(readers: Vec<tokio_rusqlite::Connection>, timeout: Duration) -> Self {
        Self {
            readers: Arc::new(readers),
            next: Arc::new(AtomicUsize::new(0)),
            timeout,
        }
    }

    async fn init_writer(conn: &tokio_rusqlite::Connection, periods: Vec<Period>) -> Result<usize> {
        conn.call(move |conn| {
            conn.execute_batch("PRAGMA busy_timeout=5000;")
                .map_err(|e| e.to_string())?;
            schema::migrations()
                .to_latest(conn)
                .map_err(|e| e.to_string())?;
            let added = schema::ensure_period_columns(conn, &periods).map_err(|e| e.to_string())?;
            Ok::<usize, String>(added)
        })
        .await
        .map_err(|e| Error::Migration(e.to_string()))
    }

    async fn init_reader(conn: &tokio_rusqlite::Connection) -> Result<()> {
        conn.call(|conn| {
            conn.execute_batch("PRAGMA busy_timeout=5000;")?;
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok::<(), rusqlite::Error>(())
        })
        .await
        .map_err(|e| Error::DatabaseUnavailable(e.to_string()))
    }

    /// Next connection from the pool.
    pub fn reader(&self) -> &tokio_rusqlite::Connection {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        &self.readers[i]
    }

    pub fn pool_size(&self) -> usize {
        self.readers.len()
    }

    /// Upper bound for a single round of queries.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[cfg(test)]
    pub(crate) fn writer(&self) -> &tokio_rusqlite::Connection {
        &self.readers[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oct_2026() -> Vec<Period> {
        vec![Period::new(2026, 10).unwrap()]
    }

    #[tokio::test]
    async fn test_open_memory() {
        let db = Database::open_memory(oct_2026()).await.unwrap();

        let tables: Vec<String> = db
            .reader()
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                Ok::<Vec<String>, rusqlite::Error>(rows.filter_map(|r| r.ok()).collect())
            })
            .await
            .unwrap();

        assert!(tables.contains(&"portfolio".to_string()));
        assert!(tables.contains(&"tickets".to_string()));
    }

    #[tokio::test]
    async fn test_open_missing_file_is_connectivity_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.db");
        let err = Database::open_at(&missing, 2, Duration::from_secs(5))
            .await
            .err()
            .unwrap();
        assert!(err.is_connectivity(), "got {err:?}");
    }

    #[tokio::test]
    async fn test_init_then_open_pool() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store").join("analytics.db");

        let added = Database::init_at(&path, oct_2026()).await.unwrap();
        assert_eq!(added, 2);
        // Second init adds nothing
        assert_eq!(Database::init_at(&path, oct_2026()).await.unwrap(), 0);

        let db = Database::open_at(&path, 3, Duration::from_secs(5)).await.unwrap();
        assert_eq!(db.pool_size(), 3);

        let count: i64 = db
            .reader()
            .call(|conn| {
                Ok::<i64, rusqlite::Error>(
                    conn.query_row("SELECT COUNT(*) FROM tickets", [], |row| row.get(0))?,
                )
            })
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_pool_is_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analytics.db");
        Database::init_at(&path, oct_2026()).await.unwrap();
        let db = Database::open_at(&path, 1, Duration::from_secs(5)).await.unwrap();

        let result = db
            .reader()
            .call(|conn| {
                conn.execute(
                    "INSERT INTO tickets (company_name, client_status, created_at) VALUES ('a', 'Open', '2026-10-01')",
                    [],
                )
            })
            .await;
        assert!(result.is_err());
    }
}
