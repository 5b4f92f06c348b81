//! HTTP page fetching.
//!
//! Every network GET the scanner makes goes through a `PageSource`, so tests
//! can swap the network for canned responses.

use crate::error::FetchError;
use async_trait::async_trait;
use std::time::Duration;

/// A fetched page.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The requested URL.
    pub url: String,
    /// The URL after redirects.
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response body decoded as text.
    pub body: String,
}

/// Something that can GET a URL within a timeout.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn get(&self, url: &str, timeout_ms: u64) -> Result<HttpResponse, FetchError>;
}

/// `PageSource` backed by a shared reqwest client.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Build a client that identifies itself with `user_agent`.
    pub fn new(user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Request {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }

    /// Wrap an existing reqwest client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageSource for HttpClient {
    async fn get(&self, url: &str, timeout_ms: u64) -> Result<HttpResponse, FetchError> {
        let parsed =
            url::Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;

        let resp = self
            .client
            .get(parsed)
            .timeout(Duration::from_millis(timeout_ms))
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, timeout_ms, e))?;

        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let body = resp
            .text()
            .await
            .map_err(|e| map_reqwest_error(url, timeout_ms, e))?;

        Ok(HttpResponse {
            url: url.to_string(),
            final_url,
            status,
            body,
        })
    }
}

fn map_reqwest_error(url: &str, timeout_ms: u64, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            timeout_ms,
        }
    } else {
        FetchError::Request {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}
