//! Translation cache record types

use serde::{Deserialize, Serialize};

/// Translation entry status
///
/// (absent) -> Pending -> {Ready, Failed}. Failed -> Pending is the one
/// permitted re-entry, driven only by an explicit new trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationStatus {
    Pending,
    Ready,
    Failed,
}

impl TranslationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranslationStatus::Pending => "pending",
            TranslationStatus::Ready => "ready",
            TranslationStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TranslationStatus::Pending),
            "ready" => Some(TranslationStatus::Ready),
            "failed" => Some(TranslationStatus::Failed),
            _ => None,
        }
    }
}

/// Memoized translation of one page into one target language.
///
/// `texts` is a JSON array of translated chunk texts, positionally aligned
/// with the page's chunks; it is only populated on Ready entries.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TranslationEntry {
    pub document_id: String,
    pub page: i64,
    pub lang: String,
    pub status: String,
    pub texts: Option<String>,
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TranslationEntry {
    pub fn status(&self) -> TranslationStatus {
        TranslationStatus::from_str(&self.status).unwrap_or(TranslationStatus::Failed)
    }

    /// Decode the translated chunk texts of a Ready entry
    pub fn chunk_texts(&self) -> Option<Vec<String>> {
        self.texts
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}

/// Validate a target language code: 1-3 lowercase ASCII alpha segments of
/// 2-8 characters separated by '-' (e.g. "zh", "pt-br").
pub fn is_valid_lang(lang: &str) -> bool {
    let segments: Vec<&str> = lang.split('-').collect();
    if segments.is_empty() || segments.len() > 3 {
        return false;
    }
    segments.iter().all(|segment| {
        (2..=8).contains(&segment.len())
            && segment.chars().all(|c| c.is_ascii_lowercase())
    })
}
