//! Database connection management

use crate::{Activities, Error, Records, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Database handle
///
/// Main entry point for the activity and record stores. It owns the SQLite
/// connection pool; handles returned by [`Database::records`] and
/// [`Database::activity`] share it and are cheap to clone.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    path: PathBuf,
}

impl Database {
    /// Open or create a database at the given path
    ///
    /// # Example
    ///
    /// ```no_run
    /// use driftwatch_core::Database;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let db = Database::open("~/.driftwatch/driftwatch.db").await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = expand_path(path)?;
        info!("Opening database at: {}", path.display());

        let pool = connect(&path).await?;
        let db = Self { pool, path };

        db.migrate().await?;

        Ok(db)
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Migration(e.to_string()))?;

        debug!("Migrations completed successfully");
        Ok(())
    }

    /// Append-only store of analysis records
    pub fn records(&self) -> Records {
        Records::new(self.pool.clone())
    }

    /// Subjects and their activity history
    pub fn activity(&self) -> Activities {
        Activities::new(self.pool.clone())
    }

    /// Trivial liveness query
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Database file name, used as the display name in diagnostics
    pub fn name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "driftwatch".to_string())
    }

    /// Names of user tables
    pub async fn collection_names(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT name
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
              AND name NOT LIKE '_sqlx_%'
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Get the underlying pool (for advanced usage)
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection
    pub async fn close(self) {
        self.pool.close().await;
    }
}

/// Open a WAL-mode SQLite pool, creating the file and its parent directory
pub(crate) async fn connect(path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Expand tilde in path
pub fn expand_path<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    let path_str = path
        .to_str()
        .ok_or_else(|| Error::Other(format!("Invalid path: {}", path.display())))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = std::env::var("HOME")
            .map_err(|_| Error::Other("HOME environment variable not set".to_string()))?;
        Ok(PathBuf::from(home).join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_database() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let db = Database::open(&db_path).await.unwrap();
        assert!(db_path.exists());
        assert_eq!(db.name(), "test");

        db.ping().await.unwrap();
        db.close().await;
    }

    #[tokio::test]
    async fn test_migrations_create_tables() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open(temp_dir.path().join("test.db")).await.unwrap();

        let names = db.collection_names().await.unwrap();
        assert_eq!(names, vec!["activities", "analysis_records", "subjects"]);

        db.close().await;
    }

    #[test]
    fn test_expand_path() {
        std::env::set_var("HOME", "/home/tester");
        let expanded = expand_path("~/test/path").unwrap();
        assert_eq!(expanded, PathBuf::from("/home/tester/test/path"));

        let normal = expand_path("/absolute/path").unwrap();
        assert_eq!(normal.to_str().unwrap(), "/absolute/path");
    }
}
