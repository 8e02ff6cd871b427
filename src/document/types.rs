//! Document and chunk record types

use serde::{Deserialize, Serialize};

/// Document lifecycle status
///
/// Transitions are monotone: the only accepted edges are
/// Pending -> Parsing, Parsing -> Ready, and Parsing -> Failed.
/// A Ready or Failed document never re-transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Parsing,
    Ready,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Parsing => "parsing",
            DocumentStatus::Ready => "ready",
            DocumentStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DocumentStatus::Pending),
            "parsing" => Some(DocumentStatus::Parsing),
            "ready" => Some(DocumentStatus::Ready),
            "failed" => Some(DocumentStatus::Failed),
            _ => None,
        }
    }

    /// Whether `self -> next` is an accepted edge of the state machine
    pub fn can_transition_to(&self, next: DocumentStatus) -> bool {
        matches!(
            (self, next),
            (DocumentStatus::Pending, DocumentStatus::Parsing)
                | (DocumentStatus::Parsing, DocumentStatus::Ready)
                | (DocumentStatus::Parsing, DocumentStatus::Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Ready | DocumentStatus::Failed)
    }
}

/// Document record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Document {
    pub id: String,
    pub user_id: String,
    pub filename: String,
    #[serde(skip)]
    pub file_path: String,
    pub status: String,
    pub page_count: i64,
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Document {
    pub fn status(&self) -> DocumentStatus {
        // The status column only ever holds values written via DocumentStatus
        DocumentStatus::from_str(&self.status).unwrap_or(DocumentStatus::Failed)
    }
}

/// One stored unit of extracted text, tied to a page and an
/// intra-page sequence position
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub page: i64,
    pub chunk_index: i64,
    pub text: String,
    /// Optional layout metadata (JSON), when the extractor provides any
    pub metadata: Option<String>,
    pub created_at: String,
}

/// One extracted page: page number (1-indexed) and its ordered chunk texts
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPage {
    pub page: u32,
    pub chunks: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_edges() {
        assert!(DocumentStatus::Pending.can_transition_to(DocumentStatus::Parsing));
        assert!(DocumentStatus::Parsing.can_transition_to(DocumentStatus::Ready));
        assert!(DocumentStatus::Parsing.can_transition_to(DocumentStatus::Failed));
    }

    #[test]
    fn test_terminal_states_reject_all_edges() {
        for terminal in [DocumentStatus::Ready, DocumentStatus::Failed] {
            for next in [
                DocumentStatus::Pending,
                DocumentStatus::Parsing,
                DocumentStatus::Ready,
                DocumentStatus::Failed,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
        assert!(!DocumentStatus::Pending.can_transition_to(DocumentStatus::Ready));
        assert!(!DocumentStatus::Pending.can_transition_to(DocumentStatus::Failed));
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            DocumentStatus::Pending,
            DocumentStatus::Parsing,
            DocumentStatus::Ready,
            DocumentStatus::Failed,
        ] {
            assert_eq!(DocumentStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(DocumentStatus::from_str("uploaded"), None);
    }
}
