use anyhow::{bail, Context, Result};
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use std::time::Duration;
use tracing::info;

use crate::retry::{with_retry_if, RetryConfig};

/// Which SQL dialect sits behind the pool.
///
/// Only the DDL and row locking differ; every DML statement is shared and
/// written with `$N` placeholders, which both drivers accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    Sqlite,
}

impl Backend {
    pub fn from_url(database_url: &str) -> Result<Self> {
        if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
            Ok(Backend::Postgres)
        } else if database_url.starts_with("sqlite:") {
            Ok(Backend::Sqlite)
        } else {
            bail!("Unsupported DATABASE_URL scheme (expected postgres:// or sqlite:)")
        }
    }

    /// Suffix that makes a SELECT lock the rows it returns until commit.
    ///
    /// SQLite has none: it takes one lock for the whole database, and a
    /// transaction that reads before writing cannot upgrade that lock while
    /// another writer holds it (SQLITE_BUSY, bypassing the busy timeout).
    /// SQLite transactions must therefore open with a write instead.
    pub(crate) fn row_lock(&self) -> Option<&'static str> {
        match self {
            Backend::Postgres => Some(" FOR UPDATE"),
            Backend::Sqlite => None,
        }
    }

    fn schema(&self) -> &'static [&'static str] {
        match self {
            Backend::Postgres => &[
                "CREATE TABLE IF NOT EXISTS languages (
                    id BIGSERIAL PRIMARY KEY,
                    code TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL
                )",
                "CREATE TABLE IF NOT EXISTS translation_keys (
                    id BIGSERIAL PRIMARY KEY,
                    key TEXT NOT NULL UNIQUE
                )",
                "CREATE TABLE IF NOT EXISTS translations (
                    id BIGSERIAL PRIMARY KEY,
                    key_id BIGINT NOT NULL REFERENCES translation_keys (id),
                    language_id BIGINT NOT NULL REFERENCES languages (id),
                    value TEXT NOT NULL DEFAULT '',
                    UNIQUE (key_id, language_id)
                )",
                "CREATE INDEX IF NOT EXISTS idx_translations_language_id
                    ON translations (language_id)",
            ],
            Backend::Sqlite => &[
                "CREATE TABLE IF NOT EXISTS languages (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    code TEXT NOT NULL UNIQUE,
                    name TEXT NOT NULL
                )",
                "CREATE TABLE IF NOT EXISTS translation_keys (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    key TEXT NOT NULL UNIQUE
                )",
                "CREATE TABLE IF NOT EXISTS translations (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    key_id INTEGER NOT NULL REFERENCES translation_keys (id),
                    language_id INTEGER NOT NULL REFERENCES languages (id),
                    value TEXT NOT NULL DEFAULT '',
                    UNIQUE (key_id, language_id)
                )",
                "CREATE INDEX IF NOT EXISTS idx_translations_language_id
                    ON translations (language_id)",
            ],
        }
    }
}

/// Shared handle to the backing store. Cheap to clone; every component takes
/// one in its constructor.
#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
    backend: Backend,
}

impl Database {
    /// Connect (retrying while the server comes up) and create the tables.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let backend = Backend::from_url(database_url)?;
        sqlx::any::install_default_drivers();

        let pool = with_retry_if(
            &RetryConfig::database_connect(),
            "Database connect",
            || {
                AnyPoolOptions::new()
                    .max_connections(max_connections)
                    .acquire_timeout(Duration::from_secs(10))
                    .connect(database_url)
            },
            is_transient,
        )
        .await
        .context("Failed to connect to database")?;

        let db = Self { pool, backend };
        db.initialize_schema().await?;

        info!("Connected to {:?} database", backend);
        Ok(db)
    }

    async fn initialize_schema(&self) -> Result<()> {
        for statement in self.backend.schema() {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to initialize database schema")?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Round-trip to the store, used by the health endpoint.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Errors worth waiting out: network trouble, pool exhaustion, or Postgres
/// reporting that it is still starting up (SQLSTATE 57P03).
fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db) => db.code().as_deref() == Some("57P03"),
        _ => false,
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::create_test_db;
    use super::*;
    use tempfile::TempDir;

    // ==================== Backend Tests ====================

    #[test]
    fn test_backend_from_url() {
        assert_eq!(Backend::from_url("postgres://u:p@localhost/db").unwrap(), Backend::Postgres);
        assert_eq!(Backend::from_url("postgresql://localhost/db").unwrap(), Backend::Postgres);
        assert_eq!(Backend::from_url("sqlite::memory:").unwrap(), Backend::Sqlite);
        assert_eq!(Backend::from_url("sqlite:///tmp/x.db").unwrap(), Backend::Sqlite);
    }

    #[test]
    fn test_backend_from_url_rejects_unknown_scheme() {
        assert!(Backend::from_url("mysql://localhost/db").is_err());
        assert!(Backend::from_url("").is_err());
    }

    #[test]
    fn test_row_lock_only_on_postgres() {
        assert_eq!(Backend::Postgres.row_lock(), Some(" FOR UPDATE"));
        assert_eq!(Backend::Sqlite.row_lock(), None);
    }

    #[test]
    fn test_transient_errors() {
        assert!(is_transient(&sqlx::Error::PoolTimedOut));
        assert!(!is_transient(&sqlx::Error::RowNotFound));
        assert!(!is_transient(&sqlx::Error::Configuration("bad".into())));
    }

    // ==================== Database Initialization Tests ====================

    #[tokio::test]
    async fn test_database_creation() {
        let (db, _temp_dir) = create_test_db().await;
        assert_eq!(db.backend(), Backend::Sqlite);
        db.ping().await.expect("Should ping");
    }

    #[tokio::test]
    async fn test_database_creates_tables() {
        let (db, _temp_dir) = create_test_db().await;

        for table in ["languages", "translation_keys", "translations"] {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(db.pool())
                .await
                .expect("Table should exist");
            assert_eq!(count, 0);
        }
    }

    #[tokio::test]
    async fn test_database_reopening() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let url = format!("sqlite://{}?mode=rwc", temp_dir.path().join("test.db").display());

        {
            let db = Database::new(&url, 1).await.expect("Failed to create database");
            sqlx::query("INSERT INTO languages (code, name) VALUES ('en', 'English')")
                .execute(db.pool())
                .await
                .expect("Should insert");
            db.pool().close().await;
        }

        {
            let db = Database::new(&url, 1).await.expect("Failed to reopen database");
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM languages")
                .fetch_one(db.pool())
                .await
                .expect("Should count");
            assert_eq!(count, 1, "Language should persist");
        }
    }

    #[tokio::test]
    async fn test_unique_pair_constraint() {
        let (db, _temp_dir) = create_test_db().await;
        sqlx::query("INSERT INTO languages (code, name) VALUES ('en', 'English')")
            .execute(db.pool())
            .await
            .expect("language");
        sqlx::query("INSERT INTO translation_keys (key) VALUES ('ui_Play')")
            .execute(db.pool())
            .await
            .expect("key");

        let insert = "INSERT INTO translations (key_id, language_id, value) VALUES (1, 1, 'Play')";
        sqlx::query(insert).execute(db.pool()).await.expect("first cell");
        let err = sqlx::query(insert)
            .execute(db.pool())
            .await
            .expect_err("second cell for the same pair must be rejected");
        assert!(crate::error::is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_invalid_database_url() {
        let result = Database::new("mysql://localhost/db", 1).await;
        assert!(result.is_err());
    }
}
