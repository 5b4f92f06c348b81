//! Error types for every collaborator the scanner talks to.
//!
//! None of these escape `Scanner::analyze`; they are logged and folded into
//! report findings. Only `ScanError` is surfaced, and only at startup.

use thiserror::Error;

/// Failure fetching a page over HTTP.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("request to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
}

/// Failure loading the tracker dataset.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("tracker list request failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("tracker list returned HTTP {0}")]
    Status(u16),

    #[error("malformed tracker list: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Failure in a domain registry or certificate lookup.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("no registered domain in {0:?}")]
    NoDomain(String),

    #[error("no record found for {0}")]
    NotFound(String),

    #[error("lookup of {target} timed out")]
    Timeout { target: String },

    #[error("lookup I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("lookup failed: {0}")]
    Failed(String),

    #[error("could not parse {what}: {detail}")]
    Parse { what: &'static str, detail: String },
}

/// Failure in an injected text capability (summarizer, normalizer, classifier).
#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("{0} capability is unavailable")]
    Unavailable(&'static str),

    #[error("capability request failed: {0}")]
    Request(String),

    #[error("capability returned an unexpected response: {0}")]
    BadResponse(String),
}

impl CapabilityError {
    pub fn request<E: std::fmt::Display>(e: E) -> Self {
        Self::Request(e.to_string())
    }

    pub fn bad_response<E: std::fmt::Display>(e: E) -> Self {
        Self::BadResponse(e.to_string())
    }
}

/// Configuration loading failure.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Startup errors for the scanner itself.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("text normalizer unavailable: {0}")]
    NormalizerUnavailable(#[source] CapabilityError),

    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    #[error("failed to build network client: {0}")]
    Client(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
