//! lopdf-backed PDF text extractor

use async_trait::async_trait;
use lopdf::Document as PdfDocument;

use super::{ExtractError, Extractor};
use crate::document::ExtractedPage;

/// Sliding-window chunking parameters
const CHUNK_SIZE: usize = 800;
const CHUNK_OVERLAP: usize = 160;

/// Extracts per-page text with lopdf and splits it into overlapping chunks
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for PdfExtractor {
    async fn extract(&self, bytes: &[u8]) -> Result<Vec<ExtractedPage>, ExtractError> {
        let bytes = bytes.to_vec();

        // lopdf parsing is CPU-bound; keep it off the async workers
        tokio::task::spawn_blocking(move || extract_pages(&bytes))
            .await
            .map_err(|e| ExtractError::ParseError(format!("Extraction task panicked: {}", e)))?
    }
}

fn extract_pages(bytes: &[u8]) -> Result<Vec<ExtractedPage>, ExtractError> {
    let doc = PdfDocument::load_mem(bytes)
        .map_err(|e| ExtractError::ParseError(e.to_string()))?;

    let mut pages = Vec::new();
    for (page_number, _) in doc.get_pages() {
        let text = doc
            .extract_text(&[page_number])
            .map_err(|e| ExtractError::ParseError(format!("Page {}: {}", page_number, e)))?;
        pages.push(ExtractedPage {
            page: page_number,
            chunks: split_text(&normalize_text(&text)),
        });
    }

    Ok(pages)
}

/// Strip per-line whitespace and drop blank lines
fn normalize_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split page text into overlapping windows of CHUNK_SIZE characters
fn split_text(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let step = CHUNK_SIZE - CHUNK_OVERLAP;
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + CHUNK_SIZE).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim().to_string();
        if !chunk.is_empty() {
            chunks.push(chunk);
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_blank_lines() {
        let text = "  Intro  \n\n   \nBody\n";
        assert_eq!(normalize_text(text), "Intro\nBody");
    }

    #[test]
    fn test_split_short_text_is_one_chunk() {
        let chunks = split_text("Hello, World!");
        assert_eq!(chunks, vec!["Hello, World!".to_string()]);
    }

    #[test]
    fn test_split_empty_text() {
        assert!(split_text("   ").is_empty());
        assert!(split_text("").is_empty());
    }

    #[test]
    fn test_split_long_text_overlaps() {
        let text = "a".repeat(2000);
        let chunks = split_text(&text);

        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].chars().count(), CHUNK_SIZE);
        // Consecutive windows advance by CHUNK_SIZE - CHUNK_OVERLAP
        let covered = CHUNK_SIZE + (chunks.len() - 1) * (CHUNK_SIZE - CHUNK_OVERLAP);
        assert!(covered >= 2000);
    }
}
