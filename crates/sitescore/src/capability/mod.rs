//! Injected text capabilities: summarization, normalization, zero-shot
//! classification.
//!
//! The scanner only depends on these traits. `HttpInference` and `Lemmatizer`
//! are the stock implementations; tests plug in deterministic stubs.

pub mod inference;
pub mod lemmatizer;

use crate::error::CapabilityError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use inference::HttpInference;
pub use lemmatizer::Lemmatizer;

/// One label with its model score in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// Abstractive summarization with a length window in tokens.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        text: &str,
        min_len: u32,
        max_len: u32,
    ) -> Result<String, CapabilityError>;
}

/// Lemmatization / cleanup applied before classification.
pub trait TextNormalizer: Send + Sync {
    /// Checked once at startup. An error here aborts scanner construction.
    fn ready(&self) -> Result<(), CapabilityError> {
        Ok(())
    }

    fn normalize(&self, text: &str) -> Result<String, CapabilityError>;
}

/// Zero-shot classification against caller-supplied labels.
///
/// Returns labels ranked best first.
#[async_trait]
pub trait ZeroShotClassifier: Send + Sync {
    async fn classify(
        &self,
        text: &str,
        labels: &[&str],
    ) -> Result<Vec<LabelScore>, CapabilityError>;
}
