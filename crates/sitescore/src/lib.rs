//! Privacy and security posture scoring for a single website.
//!
//! Given one URL, the [`Scanner`] checks reachability, transport security,
//! third-party trackers, the privacy policy and domain provenance, then folds
//! them into a score, a letter grade and a human-readable report.
//!
//! ```no_run
//! use sitescore::capability::{HttpInference, Lemmatizer};
//! use sitescore::{ScanConfig, Scanner};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScanConfig::default();
//! let inference = Arc::new(HttpInference::new(config.inference.clone(), &config.user_agent)?);
//! let scanner = Scanner::builder(config)
//!     .summarizer(inference.clone())
//!     .classifier(inference)
//!     .normalizer(Arc::new(Lemmatizer::new()))
//!     .build()?;
//!
//! let (score, report) = scanner.analyze("https://example.com").await.into_parts();
//! println!("{score}: {report:?}");
//! # Ok(())
//! # }
//! ```

pub mod capability;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetchers;
pub mod http_client;
pub mod policy;
pub mod provenance;
pub mod registry;
pub mod report;
pub mod scanner;
pub mod signal;
pub mod trackers;

pub use config::ScanConfig;
pub use error::{CapabilityError, ConfigError, FetchError, LookupError, RegistryError, ScanError};
pub use http_client::{HttpClient, HttpResponse, PageSource};
pub use registry::TrackerRegistry;
pub use report::{Category, Finding, Grade, Level, ScanReport};
pub use scanner::{ScanStage, Scanner, ScannerBuilder};
pub use signal::Signal;
pub use trackers::TrackerHit;
