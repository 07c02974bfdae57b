//! Database connection and pool management.

use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::{Path, PathBuf};
use tracing::instrument;

use crate::error::{ErrorKind, Result};

/// Embedded migrations that are run automatically on connect.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
/// SQLite's name for a private, connection-scoped database.
const IN_MEMORY: &str = ":memory:";
// Scans write one series at a time, readers are the API. 5 is plenty.
const MAX_CONNECTIONS: u32 = 5;

/// Where the catalog lives.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Location {
    File(PathBuf),
    Memory,
}
impl Location {
    fn from_path(path: &Path) -> Self {
        if path.as_os_str() == IN_MEMORY {
            Self::Memory
        } else {
            Self::File(path.to_path_buf())
        }
    }

    /// Every connection to ":memory:" is its own database, so a memory
    /// catalog gets exactly one.
    fn max_connections(&self) -> u32 {
        match self {
            Self::File(_) => MAX_CONNECTIONS,
            Self::Memory => 1,
        }
    }

    fn options(&self) -> Result<SqliteConnectOptions> {
        let options = Database::base_options();
        match self {
            Self::Memory => Ok(options.filename(IN_MEMORY)),
            Self::File(path) => {
                if let Some(parent) = path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Database)?;
                }
                Ok(options.filename(path).create_if_missing(true))
            },
        }
    }
}

/// Database connection pool for the catalog.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    #[instrument("opening catalog", skip_all, fields(location = ?location))]
    async fn open(location: Location) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // Query-based PRAGMAs have to be applied to EVERY connection the
            // pool opens, not just the first one.
            .after_connect(|conn, meta| Box::pin(async move { Self::apply_pragmas(conn, meta).await }))
            .max_connections(location.max_connections())
            .connect_with(location.options()?)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Connect to the catalog database at the given path.
    ///
    /// Creates the file (and its parent directories) if it doesn't exist and
    /// runs migrations. The path `:memory:` gives the same private database
    /// as [`connect_in_memory`](Self::connect_in_memory).
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(Location::from_path(path.as_ref())).await
    }

    /// Connect to an in-memory database.
    ///
    /// Note:
    /// - In-memory databases are destroyed when the connection closes.
    /// - Not `#[cfg(test)]`, other crates use this in their tests too.
    pub async fn connect_in_memory() -> Result<Self> {
        Self::open(Location::Memory).await
    }

    fn base_options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            // Cascading deletes (library -> series -> files) depend on this.
            .foreign_keys(true)
            .synchronous(SqliteSynchronous::Normal)
            // A scan writing a big series in one transaction can hold the
            // write lock for a while.
            .busy_timeout(std::time::Duration::from_millis(1500))
    }

    /// Apply additional PRAGMA settings that aren't exposed via SqliteConnectOptions.
    async fn apply_pragmas(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
        sqlx::query(
            r#"
                PRAGMA wal_autocheckpoint = 800;
                PRAGMA cache_size = -8192;
                PRAGMA temp_store = MEMORY;
            "#,
        )
        .execute(conn)
        .await?;
        Ok(())
    }

    #[instrument("performing database migrations", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    ///
    /// Waits for all connections to be returned to the pool and then closes
    /// them. Don't use the Database afterwards.
    pub async fn close(&self) {
        // Let SQLite update query planner statistics
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}
