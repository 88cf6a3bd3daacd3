use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::StorageError;

/// One finished analysis as persisted in the `analyses` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct AnalysisRecord {
    pub id: i64,
    pub document: String,
    pub collector_result: String,
    pub linguistic_result: String,
    pub factcheck_result: String,
    pub classification_result: String,
    pub created_at: DateTime<Utc>,
}

/// Final texts of the four analysts, in stage order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisTexts {
    pub collector: String,
    pub linguistic: String,
    pub factcheck: String,
    pub classification: String,
}

/// Append-only history of analyses. Every call is a single statement on its own.
#[derive(Debug, Clone)]
pub struct AnalysisStore {
    pool: SqlitePool,
}

impl AnalysisStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the `analyses` table if missing. Safe on every start.
    pub async fn initialize(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS analyses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document TEXT NOT NULL,
                collector_result TEXT NOT NULL,
                linguistic_result TEXT NOT NULL,
                factcheck_result TEXT NOT NULL,
                classification_result TEXT NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StorageError::query("create analyses table"))?;

        debug!("analyses table ready");
        Ok(())
    }

    /// Append one analysis; the timestamp is assigned by the database.
    pub async fn insert(&self, document: &str, texts: &AnalysisTexts) -> Result<i64, StorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO analyses
            (document, collector_result, linguistic_result, factcheck_result, classification_result)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(document)
        .bind(&texts.collector)
        .bind(&texts.linguistic)
        .bind(&texts.factcheck)
        .bind(&texts.classification)
        .execute(&self.pool)
        .await
        .map_err(StorageError::query("insert analysis"))?;

        let id = result.last_insert_rowid();
        info!(record_id = id, "stored analysis");
        Ok(id)
    }

    /// Full history, newest first.
    pub async fn list_all(&self) -> Result<Vec<AnalysisRecord>, StorageError> {
        sqlx::query_as::<_, AnalysisRecord>(
            r#"
            SELECT id, document, collector_result, linguistic_result, factcheck_result,
                   classification_result, created_at
            FROM analyses
            ORDER BY id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::query("list analyses"))
    }

    /// Single history entry.
    pub async fn get(&self, id: i64) -> Result<Option<AnalysisRecord>, StorageError> {
        sqlx::query_as::<_, AnalysisRecord>(
            r#"
            SELECT id, document, collector_result, linguistic_result, factcheck_result,
                   classification_result, created_at
            FROM analyses
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::query("fetch analysis"))
    }
}
