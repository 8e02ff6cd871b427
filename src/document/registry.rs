//! Document registry
//!
//! Authoritative record and state machine for each document's lifecycle.
//! Every mutation is a compare-and-set against the current status so that
//! concurrent triggers cannot produce lost updates: the Pending -> Parsing
//! edge doubles as the parse scheduler's dedup claim.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::types::{Document, DocumentStatus};
use crate::error::{ApiError, Result};

/// Registry over the documents table
pub struct DocumentRegistry<'a> {
    pool: &'a SqlitePool,
}

impl<'a> DocumentRegistry<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new document record in Pending
    pub async fn create(&self, user_id: &str, filename: &str, file_path: &str) -> Result<Document> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO documents (id, user_id, filename, file_path, status, page_count, created_at, updated_at)
            VALUES (?, ?, ?, ?, 'pending', 0, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(filename)
        .bind(file_path)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        tracing::info!(document_id = %id, user_id, filename, "Created document");

        self.get(&id).await
    }

    /// Get a document by id
    pub async fn get(&self, id: &str) -> Result<Document> {
        let document = sqlx::query_as::<_, Document>(
            r#"
            SELECT id, user_id, filename, file_path, status, page_count,
                   error, created_at, updated_at
            FROM documents
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        document.ok_or_else(|| ApiError::NotFound(format!("Document not found: {}", id)))
    }

    /// Transition a document along one edge of the state machine.
    ///
    /// Every accepted target has a unique origin (Pending -> Parsing,
    /// Parsing -> Ready, Parsing -> Failed), so the origin is derived and
    /// the update is a compare-and-set on it; if the row is in any other
    /// state, or raced to one, the call fails with InvalidTransition and
    /// leaves state unchanged. Returns the updated document.
    pub async fn transition(
        &self,
        id: &str,
        to: DocumentStatus,
        error: Option<&str>,
    ) -> Result<Document> {
        let from = match to {
            DocumentStatus::Parsing => DocumentStatus::Pending,
            DocumentStatus::Ready | DocumentStatus::Failed => DocumentStatus::Parsing,
            DocumentStatus::Pending => {
                return Err(ApiError::InvalidTransition(format!(
                    "Document {}: no accepted edge leads to pending",
                    id
                )));
            }
        };
        debug_assert!(from.can_transition_to(to));

        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET status = ?, error = ?, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(to.as_str())
        .bind(error)
        .bind(&now)
        .bind(id)
        .bind(from.as_str())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish a missing row from a lost CAS race
            let current = self.get(id).await?;
            return Err(ApiError::InvalidTransition(format!(
                "Document {}: expected {}, found {}",
                id,
                from.as_str(),
                current.status
            )));
        }

        tracing::info!(
            document_id = %id,
            from = from.as_str(),
            to = to.as_str(),
            "Document transitioned"
        );

        self.get(id).await
    }

    /// Record the extractor-reported page count (Parsing -> Ready path)
    pub async fn set_page_count(&self, id: &str, page_count: u32) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE documents
            SET page_count = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(page_count as i64)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
