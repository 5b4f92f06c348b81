//! Tracker registry: tracking domain -> owning company.
//!
//! Loaded once from a categorized dataset shaped as
//! `{"trackers": {category: {company: [domain, ...]}}}` and flattened.
//! A refresh builds the new map off-lock and swaps it in whole, so readers
//! see either the old map or the new one.

use crate::error::RegistryError;
use crate::http_client::PageSource;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct TrackerDataset {
    trackers: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

/// Shared, read-mostly domain -> company map.
#[derive(Debug, Default)]
pub struct TrackerRegistry {
    map: RwLock<Arc<HashMap<String, String>>>,
}

impl TrackerRegistry {
    /// An empty registry. Detection falls back to the third-party heuristic.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a registry from explicit `(domain, company)` pairs.
    pub fn from_entries<I, D, C>(entries: I) -> Self
    where
        I: IntoIterator<Item = (D, C)>,
        D: Into<String>,
        C: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(d, c)| (d.into().to_lowercase(), c.into()))
            .collect();
        Self {
            map: RwLock::new(Arc::new(map)),
        }
    }

    /// Fetch the dataset once. On failure, warn and return an empty registry.
    pub async fn load(source: &dyn PageSource, url: &str, timeout_ms: u64) -> Self {
        let registry = Self::empty();
        if let Err(e) = registry.refresh(source, url, timeout_ms).await {
            warn!("failed to load tracker list from {url}: {e}");
        }
        registry
    }

    /// Replace the contents with a fresh download.
    ///
    /// On any error the previous contents stay in place.
    pub async fn refresh(
        &self,
        source: &dyn PageSource,
        url: &str,
        timeout_ms: u64,
    ) -> Result<usize, RegistryError> {
        let resp = source.get(url, timeout_ms).await?;
        if resp.status != 200 {
            return Err(RegistryError::Status(resp.status));
        }

        let map = parse_dataset(&resp.body)?;
        let count = map.len();
        self.publish(map);
        info!("tracker list loaded: {count} domains");
        Ok(count)
    }

    /// Company owning `domain`, if it is a known tracker.
    pub fn lookup(&self, domain: &str) -> Option<String> {
        self.snapshot().get(&domain.to_lowercase()).cloned()
    }

    /// The current map. Cheap; holds the read lock only while cloning the `Arc`.
    pub fn snapshot(&self) -> Arc<HashMap<String, String>> {
        let guard = self.map.read().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    fn publish(&self, map: HashMap<String, String>) {
        let mut guard = self.map.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(map);
    }
}

/// Flatten the categorized dataset. Categories and companies are visited in
/// sorted order; a domain listed twice keeps the last company seen.
fn parse_dataset(body: &str) -> Result<HashMap<String, String>, RegistryError> {
    let dataset: TrackerDataset = serde_json::from_str(body)?;
    let mut map = HashMap::new();
    for companies in dataset.trackers.into_values() {
        for (company, domains) in companies {
            for domain in domains {
                let domain = domain.trim().to_lowercase();
                if !domain.is_empty() {
                    map.insert(domain, company.clone());
                }
            }
        }
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::http_client::{HttpClient, HttpResponse};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DATASET: &str = r#"{
        "trackers": {
            "Advertising": {
                "DoubleClick": ["doubleclick.net", "2mdn.net"],
                "Zeta": ["shared.example"]
            },
            "Analytics": {
                "Google": ["google-analytics.com"],
                "Alpha": ["shared.example"]
            }
        }
    }"#;

    #[test]
    fn test_parse_dataset_flattens() {
        let map = parse_dataset(DATASET).unwrap();
        assert_eq!(map.len(), 4);
        assert_eq!(map["doubleclick.net"], "DoubleClick");
        assert_eq!(map["2mdn.net"], "DoubleClick");
        assert_eq!(map["google-analytics.com"], "Google");
    }

    #[test]
    fn test_parse_dataset_last_write_wins() {
        // "Analytics" sorts after "Advertising", so its entry wins.
        let map = parse_dataset(DATASET).unwrap();
        assert_eq!(map["shared.example"], "Alpha");
    }

    #[test]
    fn test_parse_dataset_malformed() {
        assert!(matches!(
            parse_dataset(r#"{"categories": []}"#),
            Err(RegistryError::Malformed(_))
        ));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = TrackerRegistry::from_entries([("DoubleClick.net", "DoubleClick")]);
        assert_eq!(registry.lookup("doubleclick.net").as_deref(), Some("DoubleClick"));
        assert_eq!(registry.lookup("DOUBLECLICK.NET").as_deref(), Some("DoubleClick"));
        assert_eq!(registry.lookup("example.com"), None);
    }

    struct Canned(&'static str);

    #[async_trait::async_trait]
    impl PageSource for Canned {
        async fn get(&self, url: &str, _: u64) -> Result<HttpResponse, FetchError> {
            Ok(HttpResponse {
                url: url.to_string(),
                final_url: url.to_string(),
                status: 200,
                body: self.0.to_string(),
            })
        }
    }

    #[test]
    fn test_snapshot_survives_refresh() {
        let registry = TrackerRegistry::from_entries([("old.example", "Old")]);
        let before = registry.snapshot();

        let count = tokio_test::block_on(registry.refresh(&Canned(DATASET), "mem://list", 100))
            .unwrap();

        assert_eq!(count, 4);
        assert_eq!(before.get("old.example").map(String::as_str), Some("Old"));
        assert_eq!(registry.lookup("old.example"), None);
        assert_eq!(registry.lookup("doubleclick.net").as_deref(), Some("DoubleClick"));
    }

    #[tokio::test]
    async fn test_load_from_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/list.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DATASET))
            .mount(&server)
            .await;

        let client = HttpClient::new("sitescore-test").unwrap();
        let registry =
            TrackerRegistry::load(&client, &format!("{}/list.json", server.uri()), 2_000).await;
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.lookup("2mdn.net").as_deref(), Some("DoubleClick"));
    }

    #[tokio::test]
    async fn test_load_failure_yields_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = HttpClient::new("sitescore-test").unwrap();
        let registry = TrackerRegistry::load(&client, &server.uri(), 2_000).await;
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_contents() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{broken"))
            .mount(&server)
            .await;

        let client = HttpClient::new("sitescore-test").unwrap();
        let registry = TrackerRegistry::from_entries([("doubleclick.net", "DoubleClick")]);
        let err = registry.refresh(&client, &server.uri(), 2_000).await.unwrap_err();

        assert!(matches!(err, RegistryError::Malformed(_)));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("doubleclick.net").as_deref(), Some("DoubleClick"));
    }
}
