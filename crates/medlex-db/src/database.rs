//! Database connection and schema management.
//!
//! Wraps a pooled SQLite connection. Workers clone the handle; each clone
//! shares the pool and acquires its own connection per query or
//! transaction, so there is no ambient global session.

use std::collections::HashSet;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::Result;
use crate::schema;

/// Main store handle.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the store identified by `url` (e.g.
    /// `sqlite://medlex.db?mode=rwc`) with a bounded connection pool.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// The underlying pool, borrowed by the ingestion repository for
    /// per-citation transactions.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create all tables if they do not exist. Idempotent.
    pub async fn create_schema(&self) -> Result<()> {
        for stmt in schema::CREATE_STATEMENTS {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Drop everything and recreate. Only invoked for `--reset` runs.
    pub async fn reset_schema(&self) -> Result<()> {
        for table in schema::CHILD_TABLES {
            sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
                .execute(&self.pool)
                .await?;
        }
        for table in [schema::TABLE_CITATIONS, schema::TABLE_XML_FILES] {
            sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
                .execute(&self.pool)
                .await?;
        }
        info!("store schema dropped, recreating");
        self.create_schema().await
    }

    /// Invariant names of every source file already committed. Queried
    /// once per run for the file-level incremental-load screen.
    pub async fn loaded_file_names(&self) -> Result<HashSet<String>> {
        let names: Vec<String> = sqlx::query_scalar("SELECT xml_file_name FROM xml_files")
            .fetch_all(&self.pool)
            .await?;
        Ok(names.into_iter().collect())
    }

    /// Record-level dedup probe: is this PMID already stored?
    pub async fn citation_exists(&self, pmid: i64) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT pmid FROM citations WHERE pmid = ?")
            .bind(pmid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    /// Mark a source file as fully processed. Called once per file, after
    /// its last citation has committed.
    pub async fn record_file_loaded(&self, invariant_name: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO xml_files (xml_file_name, time_processed) VALUES (?, ?)
             ON CONFLICT (xml_file_name) DO NOTHING",
        )
        .bind(invariant_name)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Row counts used by the run report and tests.
    pub async fn stats(&self) -> Result<DatabaseStats> {
        let citations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM citations")
            .fetch_one(&self.pool)
            .await?;
        let xml_files: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM xml_files")
            .fetch_one(&self.pool)
            .await?;
        Ok(DatabaseStats {
            citations: citations as u64,
            xml_files: xml_files as u64,
        })
    }
}

/// Store statistics.
#[derive(Debug, Clone, Default)]
pub struct DatabaseStats {
    pub citations: u64,
    pub xml_files: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn scratch_db(dir: &tempfile::TempDir) -> Database {
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let db = Database::connect(&url, 2).await.unwrap();
        db.create_schema().await.unwrap();
        db
    }

    #[tokio::test]
    async fn create_schema_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let db = scratch_db(&dir).await;
        db.create_schema().await.unwrap();
        let stats = db.stats().await.unwrap();
        assert_eq!(stats.citations, 0);
        assert_eq!(stats.xml_files, 0);
    }

    #[tokio::test]
    async fn loaded_files_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let db = scratch_db(&dir).await;

        assert!(db.loaded_file_names().await.unwrap().is_empty());
        db.record_file_loaded("medline24n0001").await.unwrap();
        // Re-recording the same file must not error.
        db.record_file_loaded("medline24n0001").await.unwrap();

        let names = db.loaded_file_names().await.unwrap();
        assert_eq!(names.len(), 1);
        assert!(names.contains("medline24n0001"));
    }

    #[tokio::test]
    async fn citation_exists_on_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let db = scratch_db(&dir).await;
        assert!(!db.citation_exists(12345678).await.unwrap());
    }
}
