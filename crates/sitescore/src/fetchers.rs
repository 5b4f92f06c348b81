//! Signal fetchers: reachability, transport security, privacy policy page.

use crate::http_client::PageSource;
use tracing::{debug, warn};

/// Outcome of the reachability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reachability {
    /// Any HTTP response came back. The status is recorded but not judged.
    Reachable { status: u16, body: String },
    /// DNS, connect, timeout or any other failure.
    Unreachable { reason: String },
}

impl Reachability {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Reachability::Reachable { .. })
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            Reachability::Reachable { body, .. } => Some(body),
            Reachability::Unreachable { .. } => None,
        }
    }
}

/// GET `url` once. Any response at all counts as reachable.
pub async fn probe_reachability(
    source: &dyn PageSource,
    url: &str,
    timeout_ms: u64,
) -> Reachability {
    match source.get(url, timeout_ms).await {
        Ok(resp) => {
            debug!("{url} answered with HTTP {}", resp.status);
            Reachability::Reachable {
                status: resp.status,
                body: resp.body,
            }
        }
        Err(e) => {
            warn!("{url} is not reachable: {e}");
            Reachability::Unreachable {
                reason: e.to_string(),
            }
        }
    }
}

/// True iff `url` uses the `https` scheme. Purely syntactic; no certificate
/// is checked. Schemeless input is not secure.
pub fn is_secure_transport(url: &str) -> bool {
    url.trim_start()
        .get(..8)
        .map(|prefix| prefix.eq_ignore_ascii_case("https://"))
        .unwrap_or(false)
}

/// Candidate policy URL: `url` + `/` + `path`, without doubling the slash.
pub fn policy_url(url: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    if url.ends_with('/') {
        format!("{url}{path}")
    } else {
        format!("{url}/{path}")
    }
}

/// Fetch the privacy policy page. Only an exact HTTP 200 with a non-blank
/// body counts.
///
/// One candidate path, no retries and no link following: sites that keep
/// their policy elsewhere read as having none.
pub async fn fetch_policy_page(
    source: &dyn PageSource,
    url: &str,
    path: &str,
    timeout_ms: u64,
) -> Option<String> {
    let candidate = policy_url(url, path);
    match source.get(&candidate, timeout_ms).await {
        Ok(resp) if resp.status == 200 && !resp.body.trim().is_empty() => Some(resp.body),
        Ok(resp) if resp.status == 200 => {
            debug!("policy page at {candidate} is empty");
            None
        }
        Ok(resp) => {
            debug!("no policy at {candidate}: HTTP {}", resp.status);
            None
        }
        Err(e) => {
            warn!("privacy policy fetch failed for {candidate}: {e}");
            None
        }
    }
}
