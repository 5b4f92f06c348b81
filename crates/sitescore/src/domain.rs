//! Host and registered-domain extraction.

use std::net::IpAddr;
use url::Url;

/// Lowercased host of `url`, without port or trailing dot.
///
/// Returns `None` for strings that do not parse as absolute URLs or have no host.
pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?;
    let host = host
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_lowercase();
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

/// Public-suffix-aware root of a host (`sub.example.co.uk` -> `example.co.uk`).
///
/// IP literals and hosts without a registrable part (`localhost`) are their own
/// registered domain.
pub fn registered_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_lowercase();
    if host.parse::<IpAddr>().is_ok() {
        return host;
    }
    match psl::domain_str(&host) {
        Some(domain) => domain.to_string(),
        None => host,
    }
}

/// Registered domain of a URL's host, if it has one.
pub fn registered_domain_of(url: &str) -> Option<String> {
    host_of(url).map(|h| registered_domain(&h))
}

/// Resolve `src` against `base`, returning the absolute URL.
///
/// Relative and protocol-relative references inherit from `base`. When `base`
/// itself is not absolute only absolute `src` values resolve.
pub fn resolve_against(base: &str, src: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }
    match Url::parse(base.trim()) {
        Ok(base) => base.join(src).ok().map(|u| u.to_string()),
        Err(_) => Url::parse(src).ok().map(|u| u.to_string()),
    }
}
