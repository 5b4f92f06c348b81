//! Hosted model inference over HTTP (Hugging Face Inference API shape).
//!
//! `POST {base_url}/models/{model}` with `{"inputs": ..., "parameters": ...}`.

use super::{LabelScore, Summarizer, ZeroShotClassifier};
use crate::config::InferenceConfig;
use crate::error::CapabilityError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct SummaryItem {
    summary_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SummaryResponse {
    List(Vec<SummaryItem>),
    Single(SummaryItem),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassificationResponse {
    Columns { labels: Vec<String>, scores: Vec<f64> },
    Pairs(Vec<LabelScore>),
}

/// Summarizer and zero-shot classifier backed by a remote inference endpoint.
#[derive(Clone)]
pub struct HttpInference {
    client: reqwest::Client,
    config: InferenceConfig,
}

impl HttpInference {
    pub fn new(config: InferenceConfig, user_agent: &str) -> Result<Self, CapabilityError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(CapabilityError::request)?;
        Ok(Self { client, config })
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/models/{model}", self.config.base_url.trim_end_matches('/'))
    }

    async fn post<T: DeserializeOwned>(
        &self,
        model: &str,
        body: serde_json::Value,
    ) -> Result<T, CapabilityError> {
        let mut req = self
            .client
            .post(self.model_url(model))
            .json(&body)
            .timeout(Duration::from_millis(self.config.timeout_ms));
        if let Some(token) = &self.config.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(CapabilityError::request)?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(CapabilityError::Request(format!(
                "{model} returned HTTP {}: {}",
                status.as_u16(),
                detail.trim()
            )));
        }
        resp.json::<T>().await.map_err(CapabilityError::bad_response)
    }
}

#[async_trait]
impl Summarizer for HttpInference {
    async fn summarize(
        &self,
        text: &str,
        min_len: u32,
        max_len: u32,
    ) -> Result<String, CapabilityError> {
        let body = serde_json::json!({
            "inputs": text,
            "parameters": {
                "min_length": min_len,
                "max_length": max_len,
                "do_sample": false,
            },
        });
        let resp: SummaryResponse = self.post(&self.config.summarization_model, body).await?;
        let item = match resp {
            SummaryResponse::List(items) => items
                .into_iter()
                .next()
                .ok_or_else(|| CapabilityError::bad_response("empty summary list"))?,
            SummaryResponse::Single(item) => item,
        };
        Ok(item.summary_text.trim().to_string())
    }
}

#[async_trait]
impl ZeroShotClassifier for HttpInference {
    async fn classify(
        &self,
        text: &str,
        labels: &[&str],
    ) -> Result<Vec<LabelScore>, CapabilityError> {
        let body = serde_json::json!({
            "inputs": text,
            "parameters": { "candidate_labels": labels },
        });
        let resp: ClassificationResponse =
            self.post(&self.config.classification_model, body).await?;

        let mut ranked = match resp {
            ClassificationResponse::Columns { labels, scores } => {
                if labels.len() != scores.len() {
                    return Err(CapabilityError::bad_response(format!(
                        "{} labels but {} scores",
                        labels.len(),
                        scores.len()
                    )));
                }
                labels
                    .into_iter()
                    .zip(scores)
                    .map(|(label, score)| LabelScore { label, score })
                    .collect::<Vec<_>>()
            }
            ClassificationResponse::Pairs(pairs) => pairs,
        };
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer, token: Option<&str>) -> InferenceConfig {
        InferenceConfig {
            base_url: server.uri(),
            token: token.map(String::from),
            timeout_ms: 2_000,
            ..InferenceConfig::default()
        }
    }

    #[tokio::test]
    async fn test_summarize() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/facebook/bart-large-cnn"))
            .and(header("authorization", "Bearer tok"))
            .and(header("user-agent", "sitescore-test"))
            .and(body_partial_json(serde_json::json!({
                "parameters": {"min_length": 40, "max_length": 150}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"summary_text": "  We sell nothing.  "}
            ])))
            .mount(&server)
            .await;

        let inference = HttpInference::new(config(&server, Some("tok")), "sitescore-test").unwrap();
        let summary = inference.summarize("long policy", 40, 150).await.unwrap();
        assert_eq!(summary, "We sell nothing.");
    }

    #[tokio::test]
    async fn test_classify_columns_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/facebook/bart-large-mnli"))
            .and(body_partial_json(serde_json::json!({
                "parameters": {"candidate_labels": ["safe", "moderate risk", "high risk"]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "sequence": "text",
                "labels": ["high risk", "moderate risk", "safe"],
                "scores": [0.71, 0.2, 0.09]
            })))
            .mount(&server)
            .await;

        let inference = HttpInference::new(config(&server, None), "sitescore-test").unwrap();
        let ranked = inference
            .classify("text", &["safe", "moderate risk", "high risk"])
            .await
            .unwrap();
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].label, "high risk");
        assert!((ranked[0].score - 0.71).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_classify_pairs_shape_is_ranked() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"label": "safe", "score": 0.1},
                {"label": "moderate risk", "score": 0.6},
                {"label": "high risk", "score": 0.3}
            ])))
            .mount(&server)
            .await;

        let inference = HttpInference::new(config(&server, None), "sitescore-test").unwrap();
        let ranked = inference.classify("text", &["safe"]).await.unwrap();
        assert_eq!(ranked[0].label, "moderate risk");
        assert_eq!(ranked[2].label, "safe");
    }

    #[tokio::test]
    async fn test_http_error_is_capability_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
            .mount(&server)
            .await;

        let inference = HttpInference::new(config(&server, None), "sitescore-test").unwrap();
        let err = inference.summarize("x", 1, 2).await.unwrap_err();
        assert!(matches!(err, CapabilityError::Request(ref m) if m.contains("503")));
    }

    #[tokio::test]
    async fn test_mismatched_columns_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "labels": ["safe", "high risk"],
                "scores": [0.5]
            })))
            .mount(&server)
            .await;

        let inference = HttpInference::new(config(&server, None), "sitescore-test").unwrap();
        let err = inference.classify("x", &["safe"]).await.unwrap_err();
        assert!(matches!(err, CapabilityError::BadResponse(_)));
    }
}
