//! PDF text extraction
//!
//! Defines the extractor trait consumed by the parse scheduler and the
//! lopdf-backed implementation with the page normalization and
//! sliding-window chunking applied to extracted text.

mod pdf;

pub use pdf::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::document::ExtractedPage;

/// Extraction failure, captured on the document as its error field
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Extraction timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// External text extractor: raw file bytes in, ordered pages of ordered
/// chunk texts out
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, bytes: &[u8]) -> Result<Vec<ExtractedPage>, ExtractError>;
}
