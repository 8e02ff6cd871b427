//! Chunk store
//!
//! Durable ordered storage of extracted text chunks. The chunk set for a
//! document is committed in a single transaction exactly once; readers
//! either see the whole set or none of it.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::types::{Chunk, ExtractedPage};
use crate::error::{ApiError, Result};

/// Store over the document_chunks table
pub struct ChunkStore<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ChunkStore<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Atomically write the full chunk set for a document.
    ///
    /// Fails with Conflict if any chunks were already committed for this
    /// document (write-once). All inserts share one transaction, so a
    /// failure part-way leaves nothing visible.
    pub async fn write_all(&self, document_id: &str, pages: &[ExtractedPage]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM document_chunks WHERE document_id = ?")
                .bind(document_id)
                .fetch_one(&mut *tx)
                .await?;
        if existing > 0 {
            return Err(ApiError::Conflict(format!(
                "Chunks already committed for document {}",
                document_id
            )));
        }

        let now = Utc::now().to_rfc3339();
        let mut total = 0usize;
        for page in pages {
            for (index, text) in page.chunks.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO document_chunks (id, document_id, page, chunk_index, text, metadata, created_at)
                    VALUES (?, ?, ?, ?, ?, NULL, ?)
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(document_id)
                .bind(page.page as i64)
                .bind(index as i64)
                .bind(text)
                .bind(&now)
                .execute(&mut *tx)
                .await?;
                total += 1;
            }
        }

        tx.commit().await?;

        tracing::info!(document_id, pages = pages.len(), chunks = total, "Committed chunk set");

        Ok(())
    }

    /// Read all committed chunks for a document, ordered by (page, chunk_index)
    pub async fn read_by_document(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let chunks = sqlx::query_as::<_, Chunk>(
            r#"
            SELECT id, document_id, page, chunk_index, text, metadata, created_at
            FROM document_chunks
            WHERE document_id = ?
            ORDER BY page ASC, chunk_index ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(self.pool)
        .await?;

        if chunks.is_empty() {
            return Err(ApiError::NotFound(format!(
                "No chunks committed for document {}",
                document_id
            )));
        }

        Ok(chunks)
    }

    /// Read one page's chunks, ordered by chunk_index
    pub async fn read_by_page(&self, document_id: &str, page: u32) -> Result<Vec<Chunk>> {
        let chunks = sqlx::query_as::<_, Chunk>(
            r#"
            SELECT id, document_id, page, chunk_index, text, metadata, created_at
            FROM document_chunks
            WHERE document_id = ? AND page = ?
            ORDER BY chunk_index ASC
            "#,
        )
        .bind(document_id)
        .bind(page as i64)
        .fetch_all(self.pool)
        .await?;

        if chunks.is_empty() {
            return Err(ApiError::NotFound(format!(
                "No chunks for document {} page {}",
                document_id, page
            )));
        }

        Ok(chunks)
    }

    /// Distinct pages with committed chunks, ascending
    pub async fn pages(&self, document_id: &str) -> Result<Vec<u32>> {
        let pages: Vec<i64> = sqlx::query_scalar(
            "SELECT DISTINCT page FROM document_chunks WHERE document_id = ? ORDER BY page ASC",
        )
        .bind(document_id)
        .fetch_all(self.pool)
        .await?;

        Ok(pages.into_iter().map(|p| p as u32).collect())
    }
}
