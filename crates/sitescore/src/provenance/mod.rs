//! Domain provenance: how old a domain is and who registered it.
//!
//! Age comes from the domain registry when it answers with a creation date,
//! otherwise from the "not valid before" date of the site's TLS certificate.
//! Registrar only ever comes from the registry.

pub mod certificate;
pub mod whois;

use crate::domain::host_of;
use crate::error::LookupError;
use crate::signal::Signal;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

pub use certificate::TlsCertificateLookup;
pub use whois::WhoisClient;

/// What a domain registry knows about a domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainRecord {
    /// Creation dates in the order the registry listed them.
    pub creation_dates: Vec<NaiveDate>,
    pub registrar: Option<String>,
}

/// Fields read from a host's peer certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    pub not_before: DateTime<Utc>,
}

/// WHOIS-style lookup keyed by fully-qualified domain name.
#[async_trait]
pub trait RegistryLookup: Send + Sync {
    async fn lookup(&self, fqdn: &str) -> Result<DomainRecord, LookupError>;
}

/// Live TLS handshake against `host:443`.
#[async_trait]
pub trait CertificateLookup: Send + Sync {
    async fn peer_certificate(&self, host: &str) -> Result<CertificateInfo, LookupError>;
}

/// Resolved provenance for one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainProvenance {
    /// Age in whole years. Degraded when estimated from the certificate.
    pub age: Signal<i32>,
    pub registrar: Option<String>,
}

impl DomainProvenance {
    pub fn age_years(&self) -> Option<i32> {
        self.age.value().copied()
    }
}

/// Runs the registry lookup, then the certificate fallback.
#[derive(Clone)]
pub struct ProvenanceResolver {
    registry: Arc<dyn RegistryLookup>,
    certificates: Arc<dyn CertificateLookup>,
}

impl ProvenanceResolver {
    pub fn new(registry: Arc<dyn RegistryLookup>, certificates: Arc<dyn CertificateLookup>) -> Self {
        Self {
            registry,
            certificates,
        }
    }

    /// Resolve age and registrar for `url`, with ages relative to `reference_year`.
    pub async fn resolve(&self, url: &str, reference_year: i32) -> DomainProvenance {
        let Some(host) = host_of(url).or_else(|| host_of(&format!("https://{}", url.trim()))) else {
            return DomainProvenance {
                age: Signal::Failed(format!("no host in {url:?}")),
                registrar: None,
            };
        };

        let mut registrar = None;
        let mut registry_failure = String::from("registry returned no creation date");

        match self.registry.lookup(&host).await {
            Ok(record) => {
                registrar = record
                    .registrar
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty());
                if let Some(created) = record.creation_dates.first() {
                    let age = reference_year - created.year();
                    debug!("{host} created {created}, {age} years old");
                    return DomainProvenance {
                        age: Signal::Present(age),
                        registrar,
                    };
                }
            }
            Err(e) => {
                warn!("domain registry lookup failed for {host}: {e}");
                registry_failure = e.to_string();
            }
        }

        let age = match self.certificates.peer_certificate(&host).await {
            Ok(cert) => Signal::Degraded {
                value: reference_year - cert.not_before.year(),
                reason: format!("estimated from TLS certificate ({registry_failure})"),
            },
            Err(e) => {
                warn!("certificate fallback failed for {host}: {e}");
                Signal::Failed(format!("{registry_failure}; certificate: {e}"))
            }
        };

        DomainProvenance { age, registrar }
    }
}
