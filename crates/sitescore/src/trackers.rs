//! Tracker detection over a page's `<script src>` elements.

use crate::domain::{host_of, registered_domain, registered_domain_of, resolve_against};
use crate::registry::TrackerRegistry;
use scraper::{Html, Selector};
use serde::Serialize;
use std::collections::BTreeSet;

/// Reason attached to hits for third-party scripts not in the registry.
pub const THIRD_PARTY_REASON: &str = "External script that may collect data.";

/// One detected tracker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TrackerHit {
    /// Company name, or `3rd-party: <domain>` for unknown external scripts.
    pub name: String,
    pub reason: String,
}

impl TrackerHit {
    pub fn known(company: &str, domain: &str) -> Self {
        Self {
            name: company.to_string(),
            reason: format!("Known tracker domain: {domain}"),
        }
    }

    pub fn third_party(domain: &str) -> Self {
        Self {
            name: format!("3rd-party: {domain}"),
            reason: THIRD_PARTY_REASON.to_string(),
        }
    }
}

/// Scan `body` for scripts served from tracker or third-party domains.
///
/// Scripts resolve against `url`, so relative sources land on the site's own
/// domain and are ignored. Duplicate hits collapse.
pub fn detect(body: &str, url: &str, registry: &TrackerRegistry) -> BTreeSet<TrackerHit> {
    let site_domain = registered_domain_of(url).unwrap_or_default();
    let known = registry.snapshot();
    let mut hits = BTreeSet::new();

    for src in script_sources(body) {
        let Some(host) = resolve_against(url, &src).and_then(|abs| host_of(&abs)) else {
            continue;
        };
        let script_domain = registered_domain(&host);

        if let Some(company) = known.get(&script_domain) {
            hits.insert(TrackerHit::known(company, &script_domain));
        } else if let Some(company) = known.get(&host) {
            hits.insert(TrackerHit::known(company, &host));
        } else if !script_domain.is_empty() && script_domain != site_domain {
            hits.insert(TrackerHit::third_party(&script_domain));
        }
    }

    hits
}

/// `src` attribute of every `<script>` that has one.
fn script_sources(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(sel) = Selector::parse("script[src]") else {
        return Vec::new();
    };
    document
        .select(&sel)
        .filter_map(|el| el.value().attr("src"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
