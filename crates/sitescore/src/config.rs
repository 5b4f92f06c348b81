//! Scanner configuration.
//!
//! Layered as defaults, then an optional JSON file, then `SITESCORE_*`
//! environment variables. The CLI applies its flags last.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Disconnect's categorized tracker list.
pub const DEFAULT_TRACKER_LIST_URL: &str =
    "https://s3.amazonaws.com/lists.disconnect.me/simple_tracker_prod.json";

/// Hugging Face style inference host.
pub const DEFAULT_INFERENCE_URL: &str = "https://api-inference.huggingface.co";

/// Tunables for one scanner instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Timeout for the reachability GET.
    pub reachability_timeout_ms: u64,
    /// Timeout for the privacy policy GET.
    pub policy_timeout_ms: u64,
    /// Timeout for the tracker dataset download.
    pub registry_timeout_ms: u64,
    /// Timeout for each WHOIS round-trip.
    pub whois_timeout_ms: u64,
    /// Timeout for the certificate handshake.
    pub certificate_timeout_ms: u64,
    pub tracker_list_url: String,
    /// Path appended to the site URL to find its policy page.
    pub policy_path: String,
    /// Characters of policy text handed to the summarizer.
    pub summary_char_limit: usize,
    /// Characters of policy text normalized and classified.
    pub normalize_char_limit: usize,
    pub summary_min_tokens: u32,
    pub summary_max_tokens: u32,
    /// Year used for age arithmetic. `None` means the current UTC year.
    pub reference_year: Option<i32>,
    pub user_agent: String,
    pub inference: InferenceConfig,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            reachability_timeout_ms: 6_000,
            policy_timeout_ms: 8_000,
            registry_timeout_ms: 10_000,
            whois_timeout_ms: 10_000,
            certificate_timeout_ms: 5_000,
            tracker_list_url: DEFAULT_TRACKER_LIST_URL.to_string(),
            policy_path: "privacy-policy".to_string(),
            summary_char_limit: 3_000,
            normalize_char_limit: 1_500,
            summary_min_tokens: 40,
            summary_max_tokens: 150,
            reference_year: None,
            user_agent: format!("sitescore/{}", env!("CARGO_PKG_VERSION")),
            inference: InferenceConfig::default(),
        }
    }
}

/// Where the summarization and classification models live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub base_url: String,
    /// Bearer token, if the endpoint needs one.
    pub token: Option<String>,
    pub summarization_model: String,
    pub classification_model: String,
    pub timeout_ms: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_INFERENCE_URL.to_string(),
            token: None,
            summarization_model: "facebook/bart-large-cnn".to_string(),
            classification_model: "facebook/bart-large-mnli".to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl ScanConfig {
    /// Read a JSON config file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Apply `SITESCORE_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_vars<F>(&mut self, get: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = get("SITESCORE_TRACKER_LIST_URL") {
            self.tracker_list_url = v;
        }
        if let Some(v) = get("SITESCORE_POLICY_PATH") {
            self.policy_path = v;
        }
        if let Some(v) = get("SITESCORE_REFERENCE_YEAR") {
            self.reference_year = Some(parse_var("SITESCORE_REFERENCE_YEAR", &v)?);
        }
        if let Some(v) = get("SITESCORE_REACHABILITY_TIMEOUT_MS") {
            self.reachability_timeout_ms = parse_var("SITESCORE_REACHABILITY_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("SITESCORE_POLICY_TIMEOUT_MS") {
            self.policy_timeout_ms = parse_var("SITESCORE_POLICY_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("SITESCORE_INFERENCE_URL") {
            self.inference.base_url = v;
        }
        if let Some(v) = get("SITESCORE_INFERENCE_TOKEN").or_else(|| get("HF_TOKEN")) {
            self.inference.token = Some(v);
        }
        Ok(())
    }

    /// Defaults, then `path` if given, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.reachability_timeout_ms, 6_000);
        assert_eq!(config.policy_timeout_ms, 8_000);
        assert_eq!(config.registry_timeout_ms, 10_000);
        assert_eq!(config.policy_path, "privacy-policy");
        assert_eq!(config.summary_char_limit, 3_000);
        assert_eq!(config.normalize_char_limit, 1_500);
        assert!(config.reference_year.is_none());
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"reference_year": 2025, "inference": {{"timeout_ms": 1000}}}}"#
        )
        .unwrap();

        let config = ScanConfig::from_file(file.path()).unwrap();
        assert_eq!(config.reference_year, Some(2025));
        assert_eq!(config.inference.timeout_ms, 1000);
        // Untouched keys keep their defaults.
        assert_eq!(config.policy_timeout_ms, 8_000);
        assert_eq!(
            config.inference.summarization_model,
            "facebook/bart-large-cnn"
        );
    }

    #[test]
    fn test_from_file_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = ScanConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_apply_vars() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("SITESCORE_REFERENCE_YEAR", "2030"),
            ("SITESCORE_TRACKER_LIST_URL", "http://localhost/list.json"),
            ("HF_TOKEN", "secret"),
        ]);
        let mut config = ScanConfig::default();
        config
            .apply_vars(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.reference_year, Some(2030));
        assert_eq!(config.tracker_list_url, "http://localhost/list.json");
        assert_eq!(config.inference.token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_apply_vars_rejects_bad_number() {
        let mut config = ScanConfig::default();
        let err = config
            .apply_vars(|k| (k == "SITESCORE_REFERENCE_YEAR").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
