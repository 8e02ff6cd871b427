//! Machine translation providers
//!
//! Defines the translator trait and the Ollama-backed implementation.
//! The trait takes all chunk texts of a page in one call so that a page's
//! translation is a single external invocation.

use async_trait::async_trait;
use thiserror::Error;

/// Translator failure, captured on the translation entry as its error field
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("Translator API error: {0}")]
    ApiError(String),

    #[error("Translator returned {got} texts for {expected} chunks")]
    ShapeMismatch { expected: usize, got: usize },

    #[error("Translation timed out after {0} seconds")]
    Timeout(u64),
}

/// External machine-translation provider
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate one page's chunk texts into the target language.
    ///
    /// Must return exactly one translated text per input chunk, in order.
    async fn translate(&self, texts: &[String], lang: &str) -> Result<Vec<String>, TranslateError>;
}

/// Ollama-backed translator
pub struct OllamaTranslator {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaTranslator {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    async fn translate_one(&self, text: &str, lang: &str) -> Result<String, TranslateError> {
        let url = format!("{}/api/generate", self.base_url);
        let prompt = format!(
            "Translate the following text into the language with code '{}'. \
             Return only the translation, nothing else.\n\n{}",
            lang, text
        );

        let request = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false
        });

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| TranslateError::ApiError(format!("Failed to call Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TranslateError::ApiError(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TranslateError::ApiError(format!("Failed to parse response: {}", e)))?;

        Ok(result["response"].as_str().unwrap_or("").trim().to_string())
    }
}

#[async_trait]
impl Translator for OllamaTranslator {
    async fn translate(&self, texts: &[String], lang: &str) -> Result<Vec<String>, TranslateError> {
        let mut translated = Vec::with_capacity(texts.len());
        for text in texts {
            translated.push(self.translate_one(text, lang).await?);
        }
        Ok(translated)
    }
}
