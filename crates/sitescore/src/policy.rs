//! Privacy policy risk analysis.
//!
//! Summarize, normalize, then zero-shot classify the policy text. The models
//! themselves sit behind the `capability` traits.

use crate::capability::{Summarizer, TextNormalizer, ZeroShotClassifier};
use crate::config::ScanConfig;
use crate::signal::Signal;
use scraper::Html;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

pub const SUMMARY_UNAVAILABLE: &str = "Summarizer not available.";
pub const SUMMARY_FAILED: &str = "Unable to summarize privacy policy.";

/// Candidate labels, in the order handed to the classifier.
pub const RISK_LABELS: [&str; 3] = ["safe", "moderate risk", "high risk"];

/// Policy risk bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLabel {
    Safe,
    ModerateRisk,
    HighRisk,
}

impl RiskLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLabel::Safe => "safe",
            RiskLabel::ModerateRisk => "moderate risk",
            RiskLabel::HighRisk => "high risk",
        }
    }

    /// Parse one of `RISK_LABELS`, ignoring case and surrounding space.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "safe" => Some(RiskLabel::Safe),
            "moderate risk" => Some(RiskLabel::ModerateRisk),
            "high risk" => Some(RiskLabel::HighRisk),
            _ => None,
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Top classification with confidence as a percentage, two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub label: RiskLabel,
    pub confidence: f64,
}

/// Everything learned from one policy page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyAnalysis {
    pub summary: String,
    pub risk: Signal<RiskAssessment>,
}

/// Character budgets and summary length window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyLimits {
    pub summary_chars: usize,
    pub normalize_chars: usize,
    pub summary_min_tokens: u32,
    pub summary_max_tokens: u32,
}

impl Default for PolicyLimits {
    fn default() -> Self {
        Self::from(&ScanConfig::default())
    }
}

impl From<&ScanConfig> for PolicyLimits {
    fn from(config: &ScanConfig) -> Self {
        Self {
            summary_chars: config.summary_char_limit,
            normalize_chars: config.normalize_char_limit,
            summary_min_tokens: config.summary_min_tokens,
            summary_max_tokens: config.summary_max_tokens,
        }
    }
}

/// Drives the three text capabilities over a policy page.
#[derive(Clone)]
pub struct PolicyAnalyzer {
    summarizer: Option<Arc<dyn Summarizer>>,
    normalizer: Arc<dyn TextNormalizer>,
    classifier: Arc<dyn ZeroShotClassifier>,
    limits: PolicyLimits,
}

impl PolicyAnalyzer {
    pub fn new(
        summarizer: Option<Arc<dyn Summarizer>>,
        normalizer: Arc<dyn TextNormalizer>,
        classifier: Arc<dyn ZeroShotClassifier>,
        limits: PolicyLimits,
    ) -> Self {
        Self {
            summarizer,
            normalizer,
            classifier,
            limits,
        }
    }

    /// Summarize, then normalize, then classify. Never fails; missing pieces
    /// come back as sentinels or a failed risk signal.
    pub async fn analyze(&self, policy_page: &str) -> PolicyAnalysis {
        let text = visible_text(policy_page);

        let summary = match &self.summarizer {
            None => SUMMARY_UNAVAILABLE.to_string(),
            Some(summarizer) => {
                let excerpt = truncate_chars(&text, self.limits.summary_chars);
                match summarizer
                    .summarize(
                        excerpt,
                        self.limits.summary_min_tokens,
                        self.limits.summary_max_tokens,
                    )
                    .await
                {
                    Ok(s) if !s.trim().is_empty() => s.trim().to_string(),
                    Ok(_) => SUMMARY_FAILED.to_string(),
                    Err(e) => {
                        warn!("policy summarization failed: {e}");
                        SUMMARY_FAILED.to_string()
                    }
                }
            }
        };

        let excerpt = truncate_chars(&text, self.limits.normalize_chars);
        let cleaned = match self.normalizer.normalize(excerpt) {
            Ok(cleaned) => cleaned,
            Err(e) => {
                warn!("policy normalization failed, classifying raw text: {e}");
                excerpt.to_string()
            }
        };

        let risk = match self.classifier.classify(&cleaned, &RISK_LABELS).await {
            Ok(ranked) => top_assessment(&ranked),
            Err(e) => {
                warn!("policy classification failed: {e}");
                Signal::Failed(e.to_string())
            }
        };

        PolicyAnalysis { summary, risk }
    }
}

fn top_assessment(ranked: &[crate::capability::LabelScore]) -> Signal<RiskAssessment> {
    let Some(top) = ranked.first() else {
        return Signal::Failed("classifier returned no labels".to_string());
    };
    if !top.score.is_finite() || !(0.0..=1.0).contains(&top.score) {
        return Signal::Failed(format!(
            "score {} for {:?} is not a probability",
            top.score, top.label
        ));
    }
    match RiskLabel::from_label(&top.label) {
        Some(label) => Signal::Present(RiskAssessment {
            label,
            confidence: round_percent(top.score),
        }),
        None => Signal::Failed(format!("unexpected label {:?}", top.label)),
    }
}

/// `0.87654` -> `87.65`.
pub fn round_percent(score: f64) -> f64 {
    (score * 100.0 * 100.0).round() / 100.0
}

/// The first `max` characters of `text`, cut on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Readable text of an HTML page: no head, scripts or styles, whitespace
/// collapsed. Plain text passes through.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .map(|e| matches!(e.name(), "head" | "script" | "style" | "noscript" | "template"))
                .unwrap_or(false)
        });
        if hidden {
            continue;
        }
        for word in text.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
    }
    out
}
