//! Peer certificate lookup over a live TLS handshake.

use super::{CertificateInfo, CertificateLookup};
use crate::error::LookupError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// `CertificateLookup` that connects to `https://host:443/` and reads the leaf
/// certificate. The chain is validated as for any other request, so hosts
/// with broken TLS yield an error rather than a date.
#[derive(Clone)]
pub struct TlsCertificateLookup {
    client: reqwest::Client,
    timeout: Duration,
}

impl TlsCertificateLookup {
    pub fn new(user_agent: &str, timeout_ms: u64) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .tls_info(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| LookupError::Failed(e.to_string()))?;
        Ok(Self {
            client,
            timeout: Duration::from_millis(timeout_ms),
        })
    }
}

#[async_trait]
impl CertificateLookup for TlsCertificateLookup {
    async fn peer_certificate(&self, host: &str) -> Result<CertificateInfo, LookupError> {
        let authority = if host.contains(':') {
            format!("[{host}]")
        } else {
            host.to_string()
        };
        let url = format!("https://{authority}:443/");

        let resp = self
            .client
            .head(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LookupError::Timeout {
                        target: host.to_string(),
                    }
                } else {
                    LookupError::Failed(format!("TLS connection to {host}: {e}"))
                }
            })?;

        let der = resp
            .extensions()
            .get::<reqwest::tls::TlsInfo>()
            .and_then(|info| info.peer_certificate())
            .ok_or_else(|| LookupError::NotFound(format!("peer certificate for {host}")))?;

        Ok(CertificateInfo {
            not_before: not_before_from_der(der)?,
        })
    }
}

/// "Not valid before" of a DER-encoded X.509 certificate.
pub fn not_before_from_der(der: &[u8]) -> Result<DateTime<Utc>, LookupError> {
    let (_, cert) = x509_parser::parse_x509_certificate(der).map_err(|e| LookupError::Parse {
        what: "certificate",
        detail: format!("{e:?}"),
    })?;
    let ts = cert.validity().not_before.timestamp();
    DateTime::from_timestamp(ts, 0).ok_or(LookupError::Parse {
        what: "certificate validity",
        detail: format!("timestamp {ts} out of range"),
    })
}
