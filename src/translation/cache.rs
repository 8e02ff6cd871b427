//! Translation cache
//!
//! Durable memoization of translated page text. The cache row itself is the
//! job dedup lock: claiming a key is an insert-if-absent (or a
//! Failed -> Pending compare-and-set for an explicit re-trigger), so at most
//! one translation job is ever in flight per (document, page, lang) and a
//! Ready entry is never overwritten.

use chrono::Utc;
use sqlx::SqlitePool;

use super::types::{TranslationEntry, TranslationStatus};
use crate::error::Result;

/// Cache over the translations table
pub struct TranslationCache<'a> {
    pool: &'a SqlitePool,
}

impl<'a> TranslationCache<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the entry for a key, whatever its status
    pub async fn get(&self, document_id: &str, page: u32, lang: &str) -> Result<Option<TranslationEntry>> {
        let entry = sqlx::query_as::<_, TranslationEntry>(
            r#"
            SELECT document_id, page, lang, status, texts, error, created_at, updated_at
            FROM translations
            WHERE document_id = ? AND page = ? AND lang = ?
            "#,
        )
        .bind(document_id)
        .bind(page as i64)
        .bind(lang)
        .fetch_optional(self.pool)
        .await?;

        Ok(entry)
    }

    /// Get the translated chunk texts for a key if a Ready entry exists.
    ///
    /// Returns None otherwise; reads fall back to raw chunk text rather
    /// than erroring or blocking on in-flight work.
    pub async fn get_ready(&self, document_id: &str, page: u32, lang: &str) -> Result<Option<Vec<String>>> {
        let entry = self.get(document_id, page, lang).await?;
        Ok(entry
            .filter(|e| e.status() == TranslationStatus::Ready)
            .and_then(|e| e.chunk_texts()))
    }

    /// Attempt to claim a key for a translation job.
    ///
    /// Returns true iff this caller now owns the key: either the row did
    /// not exist and a Pending row was inserted, or an existing Failed row
    /// was re-armed to Pending. A Pending row (job in flight) or a Ready
    /// row (memoized result) refuses the claim, making duplicate triggers
    /// no-ops.
    pub async fn claim(&self, document_id: &str, page: u32, lang: &str) -> Result<bool> {
        let now = Utc::now().to_rfc3339();

        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO translations (document_id, page, lang, status, created_at, updated_at)
            VALUES (?, ?, ?, 'pending', ?, ?)
            "#,
        )
        .bind(document_id)
        .bind(page as i64)
        .bind(lang)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        if inserted.rows_affected() > 0 {
            return Ok(true);
        }

        // Row exists; only a Failed entry may be re-armed, and only by an
        // explicit trigger like this one.
        let rearmed = sqlx::query(
            r#"
            UPDATE translations
            SET status = 'pending', error = NULL, updated_at = ?
            WHERE document_id = ? AND page = ? AND lang = ? AND status = 'failed'
            "#,
        )
        .bind(&now)
        .bind(document_id)
        .bind(page as i64)
        .bind(lang)
        .execute(self.pool)
        .await?;

        Ok(rearmed.rows_affected() > 0)
    }

    /// Complete a claimed key with translated chunk texts (Pending -> Ready)
    pub async fn complete(
        &self,
        document_id: &str,
        page: u32,
        lang: &str,
        texts: &[String],
    ) -> Result<()> {
        let encoded = serde_json::to_string(texts)
            .map_err(|e| crate::error::ApiError::Validation(format!("Encode translation: {}", e)))?;

        sqlx::query(
            r#"
            UPDATE translations
            SET status = 'ready', texts = ?, error = NULL, updated_at = ?
            WHERE document_id = ? AND page = ? AND lang = ? AND status = 'pending'
            "#,
        )
        .bind(&encoded)
        .bind(Utc::now().to_rfc3339())
        .bind(document_id)
        .bind(page as i64)
        .bind(lang)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Fail a claimed key with the captured error (Pending -> Failed).
    ///
    /// The entry remains so reads keep falling back to raw text; a fresh
    /// trigger may re-arm it via `claim`.
    pub async fn fail(&self, document_id: &str, page: u32, lang: &str, error: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE translations
            SET status = 'failed', error = ?, updated_at = ?
            WHERE document_id = ? AND page = ? AND lang = ? AND status = 'pending'
            "#,
        )
        .bind(error)
        .bind(Utc::now().to_rfc3339())
        .bind(document_id)
        .bind(page as i64)
        .bind(lang)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
