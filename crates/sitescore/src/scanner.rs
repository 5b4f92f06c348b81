//! Scoring orchestrator.
//!
//! One `analyze` call walks
//! `Init -> Reachability -> (Unreachable | Transport -> Trackers -> Policy ->
//! Provenance -> Finalize)`. Reachability is a hard gate; every later signal
//! degrades on its own without failing the scan.

use crate::capability::{Summarizer, TextNormalizer, ZeroShotClassifier};
use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::fetchers::{self, Reachability};
use crate::http_client::{HttpClient, PageSource};
use crate::policy::{PolicyAnalysis, PolicyAnalyzer, PolicyLimits, RiskLabel};
use crate::provenance::{
    CertificateLookup, DomainProvenance, ProvenanceResolver, RegistryLookup, TlsCertificateLookup,
    WhoisClient,
};
use crate::registry::TrackerRegistry;
use crate::report::{
    Category, Level, ReportBuilder, ScanReport, HIGH_RISK_POLICY_PENALTY,
    INSECURE_TRANSPORT_PENALTY, MISSING_POLICY_PENALTY, MODERATE_RISK_POLICY_PENALTY,
    PER_TRACKER_PENALTY,
};
use crate::signal::Signal;
use crate::trackers::{self, TrackerHit};
use chrono::{Datelike, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

const UNKNOWN_PROTECTED: &str = "Unknown (privacy-protected)";

/// Where a scan currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStage {
    Init,
    Reachability,
    Unreachable,
    Transport,
    Trackers,
    Policy,
    Provenance,
    Finalize,
}

/// Analyzes one URL at a time; cheap to share across tasks.
pub struct Scanner {
    config: ScanConfig,
    pages: Arc<dyn PageSource>,
    registry: Arc<TrackerRegistry>,
    provenance: ProvenanceResolver,
    policy: PolicyAnalyzer,
}

impl Scanner {
    pub fn builder(config: ScanConfig) -> ScannerBuilder {
        ScannerBuilder::new(config)
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<TrackerRegistry> {
        &self.registry
    }

    /// Year ages are computed against.
    pub fn reference_year(&self) -> i32 {
        self.config
            .reference_year
            .unwrap_or_else(|| Utc::now().year())
    }

    /// Score `url` and build its report. Never fails: an unreachable site
    /// scores 0 and every other problem becomes a finding.
    pub async fn analyze(&self, url: &str) -> ScanReport {
        let mut stage = ScanStage::Init;
        advance(&mut stage, ScanStage::Reachability, url);

        let reachability =
            fetchers::probe_reachability(self.pages.as_ref(), url, self.config.reachability_timeout_ms)
                .await;
        let body = match reachability {
            Reachability::Reachable { body, .. } => body,
            Reachability::Unreachable { .. } => {
                advance(&mut stage, ScanStage::Unreachable, url);
                return ScanReport::unreachable(url);
            }
        };

        let mut report = ReportBuilder::new(url);
        report.record(Category::Status, Level::Ok, "Website reachable");

        advance(&mut stage, ScanStage::Transport, url);
        if fetchers::is_secure_transport(url) {
            report.record(Category::Https, Level::Ok, "Secure (HTTPS enabled)");
        } else {
            report.record(Category::Https, Level::Warn, "Not Secure (No HTTPS)");
            report.deduct(INSECURE_TRANSPORT_PENALTY);
        }

        advance(&mut stage, ScanStage::Trackers, url);
        let hits = trackers::detect(&body, url, &self.registry);
        record_trackers(&mut report, &hits);

        // Policy and provenance share no state; collect both at once and
        // apply their deductions in table order afterwards.
        advance(&mut stage, ScanStage::Policy, url);
        let reference_year = self.reference_year();
        let policy = async {
            let page = fetchers::fetch_policy_page(
                self.pages.as_ref(),
                url,
                &self.config.policy_path,
                self.config.policy_timeout_ms,
            )
            .await?;
            Some(self.policy.analyze(&page).await)
        };
        let (policy, provenance) =
            tokio::join!(policy, self.provenance.resolve(url, reference_year));
        record_policy(&mut report, policy.as_ref());

        advance(&mut stage, ScanStage::Provenance, url);
        record_provenance(&mut report, &provenance);

        advance(&mut stage, ScanStage::Finalize, url);
        let report = report.finish();
        info!(url, score = report.score, grade = %report.grade, "scan complete");
        report
    }
}

fn advance(stage: &mut ScanStage, next: ScanStage, url: &str) {
    debug!(url, from = ?stage, to = ?next, "scan stage");
    *stage = next;
}

fn record_trackers(report: &mut ReportBuilder, hits: &BTreeSet<TrackerHit>) {
    if hits.is_empty() {
        report.record(Category::Trackers, Level::Ok, "No trackers detected");
        return;
    }
    let mut text = format!("{} trackers detected:", hits.len());
    for hit in hits {
        text.push_str(&format!("\n• {} - {}", hit.name, hit.reason));
    }
    report.record(Category::Trackers, Level::Warn, text);
    report.deduct(PER_TRACKER_PENALTY * hits.len() as i32);
}

fn record_policy(report: &mut ReportBuilder, analysis: Option<&PolicyAnalysis>) {
    let Some(analysis) = analysis else {
        report.record(Category::PolicyFound, Level::Fail, "No privacy policy detected");
        report.record(Category::PolicySummary, Level::Info, "No summary available.");
        report.deduct(MISSING_POLICY_PENALTY);
        return;
    };

    report.record(Category::PolicyFound, Level::Ok, "Privacy policy found");
    report.record(
        Category::PolicySummary,
        Level::Info,
        format!("Summary: {}", analysis.summary),
    );

    match analysis.risk.value() {
        Some(risk) => {
            let (level, penalty) = match risk.label {
                RiskLabel::Safe => (Level::Ok, 0),
                RiskLabel::ModerateRisk => (Level::Warn, MODERATE_RISK_POLICY_PENALTY),
                RiskLabel::HighRisk => (Level::Fail, HIGH_RISK_POLICY_PENALTY),
            };
            report.record(
                Category::PolicyAi,
                level,
                format!(
                    "AI Risk Level: {} ({}% confidence)",
                    risk.label.as_str().to_uppercase(),
                    risk.confidence
                ),
            );
            report.deduct(penalty);
        }
        None => report.record(
            Category::PolicyAi,
            Level::Info,
            "AI Risk Level: UNKNOWN (classification unavailable)",
        ),
    }
}

fn record_provenance(report: &mut ReportBuilder, provenance: &DomainProvenance) {
    // The certificate estimate stays on the signal; the report reads the same.
    // A creation year after the reference year is shown as unknown.
    let age = match &provenance.age {
        Signal::Present(years) | Signal::Degraded { value: years, .. } if *years >= 0 => {
            format!("{years} years")
        }
        _ => UNKNOWN_PROTECTED.to_string(),
    };
    if let Signal::Degraded { reason, .. } = &provenance.age {
        debug!("domain age {reason}");
    }
    report.record(Category::DomainAge, Level::Info, age);
    report.record(
        Category::Registrar,
        Level::Info,
        provenance
            .registrar
            .clone()
            .unwrap_or_else(|| UNKNOWN_PROTECTED.to_string()),
    );
    debug!(score = report.score(), "provenance recorded");
}

/// Assembles a `Scanner`, defaulting the network collaborators.
///
/// The classifier and normalizer have no default and must be supplied.
pub struct ScannerBuilder {
    config: ScanConfig,
    pages: Option<Arc<dyn PageSource>>,
    registry: Option<Arc<TrackerRegistry>>,
    registry_lookup: Option<Arc<dyn RegistryLookup>>,
    certificates: Option<Arc<dyn CertificateLookup>>,
    summarizer: Option<Arc<dyn Summarizer>>,
    normalizer: Option<Arc<dyn TextNormalizer>>,
    classifier: Option<Arc<dyn ZeroShotClassifier>>,
}

impl ScannerBuilder {
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            pages: None,
            registry: None,
            registry_lookup: None,
            certificates: None,
            summarizer: None,
            normalizer: None,
            classifier: None,
        }
    }

    pub fn pages(mut self, pages: Arc<dyn PageSource>) -> Self {
        self.pages = Some(pages);
        self
    }

    pub fn tracker_registry(mut self, registry: Arc<TrackerRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn registry_lookup(mut self, lookup: Arc<dyn RegistryLookup>) -> Self {
        self.registry_lookup = Some(lookup);
        self
    }

    pub fn certificates(mut self, lookup: Arc<dyn CertificateLookup>) -> Self {
        self.certificates = Some(lookup);
        self
    }

    pub fn summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn normalizer(mut self, normalizer: Arc<dyn TextNormalizer>) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    pub fn classifier(mut self, classifier: Arc<dyn ZeroShotClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Fails if the normalizer is missing or not ready; that is the only
    /// condition allowed to stop the scanner from starting.
    pub fn build(self) -> Result<Scanner, ScanError> {
        let normalizer = self
            .normalizer
            .ok_or(ScanError::MissingCollaborator("text normalizer"))?;
        normalizer.ready().map_err(ScanError::NormalizerUnavailable)?;
        let classifier = self
            .classifier
            .ok_or(ScanError::MissingCollaborator("zero-shot classifier"))?;

        let config = self.config;
        let pages: Arc<dyn PageSource> = match self.pages {
            Some(p) => p,
            None => Arc::new(
                HttpClient::new(&config.user_agent).map_err(|e| ScanError::Client(e.to_string()))?,
            ),
        };
        let registry_lookup: Arc<dyn RegistryLookup> = match self.registry_lookup {
            Some(l) => l,
            None => Arc::new(WhoisClient::new(config.whois_timeout_ms)),
        };
        let certificates: Arc<dyn CertificateLookup> = match self.certificates {
            Some(c) => c,
            None => Arc::new(
                TlsCertificateLookup::new(&config.user_agent, config.certificate_timeout_ms)
                    .map_err(|e| ScanError::Client(e.to_string()))?,
            ),
        };

        let policy = PolicyAnalyzer::new(
            self.summarizer,
            normalizer,
            classifier,
            PolicyLimits::from(&config),
        );

        Ok(Scanner {
            pages,
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(TrackerRegistry::empty())),
            provenance: ProvenanceResolver::new(registry_lookup, certificates),
            policy,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{LabelScore, Lemmatizer};
    use crate::error::CapabilityError;
    use async_trait::async_trait;

    struct NotReady;

    impl TextNormalizer for NotReady {
        fn ready(&self) -> Result<(), CapabilityError> {
            Err(CapabilityError::Unavailable("lemmatizer model"))
        }

        fn normalize(&self, text: &str) -> Result<String, CapabilityError> {
            Ok(text.to_string())
        }
    }

    struct AlwaysSafe;

    #[async_trait]
    impl ZeroShotClassifier for AlwaysSafe {
        async fn classify(
            &self,
            _: &str,
            _: &[&str],
        ) -> Result<Vec<LabelScore>, CapabilityError> {
            Ok(vec![LabelScore {
                label: "safe".to_string(),
                score: 1.0,
            }])
        }
    }

    #[test]
    fn test_build_fails_when_normalizer_not_ready() {
        let result = Scanner::builder(ScanConfig::default())
            .normalizer(Arc::new(NotReady))
            .classifier(Arc::new(AlwaysSafe))
            .build();
        assert!(matches!(result, Err(ScanError::NormalizerUnavailable(_))));
    }

    #[test]
    fn test_build_requires_normalizer_and_classifier() {
        let result = Scanner::builder(ScanConfig::default())
            .classifier(Arc::new(AlwaysSafe))
            .build();
        assert!(matches!(
            result,
            Err(ScanError::MissingCollaborator("text normalizer"))
        ));

        let result = Scanner::builder(ScanConfig::default())
            .normalizer(Arc::new(Lemmatizer::new()))
            .build();
        assert!(matches!(
            result,
            Err(ScanError::MissingCollaborator("zero-shot classifier"))
        ));
    }

    #[test]
    fn test_reference_year_defaults_to_now() {
        let scanner = Scanner::builder(ScanConfig::default())
            .normalizer(Arc::new(Lemmatizer::new()))
            .classifier(Arc::new(AlwaysSafe))
            .build()
            .unwrap();
        assert_eq!(scanner.reference_year(), Utc::now().year());
        assert!(scanner.registry().is_empty());

        let fixed = Scanner::builder(ScanConfig {
            reference_year: Some(2025),
            ..ScanConfig::default()
        })
        .normalizer(Arc::new(Lemmatizer::new()))
        .classifier(Arc::new(AlwaysSafe))
        .build()
        .unwrap();
        assert_eq!(fixed.reference_year(), 2025);
    }

    #[test]
    fn test_tracker_findings_text() {
        let mut report = ReportBuilder::new("https://example.com");
        let hits: BTreeSet<_> = [
            TrackerHit::third_party("other.net"),
            TrackerHit::known("Google", "google-analytics.com"),
        ]
        .into_iter()
        .collect();
        record_trackers(&mut report, &hits);
        assert_eq!(report.score(), 84);
        let report = report.finish();
        assert_eq!(
            report.text(Category::Trackers),
            Some(
                "2 trackers detected:\n\
                 • 3rd-party: other.net - External script that may collect data.\n\
                 • Google - Known tracker domain: google-analytics.com"
            )
        );
    }

    #[test]
    fn test_provenance_text_hides_source_and_negative_age() {
        let render = |age: Signal<i32>| {
            let mut report = ReportBuilder::new("https://example.com");
            record_provenance(
                &mut report,
                &DomainProvenance {
                    age,
                    registrar: None,
                },
            );
            report.finish().text(Category::DomainAge).map(str::to_string)
        };

        assert_eq!(render(Signal::Present(0)).as_deref(), Some("0 years"));
        assert_eq!(
            render(Signal::Degraded {
                value: 6,
                reason: "estimated from TLS certificate".to_string()
            })
            .as_deref(),
            Some("6 years")
        );
        assert_eq!(
            render(Signal::Present(-3)).as_deref(),
            Some(UNKNOWN_PROTECTED)
        );
        assert_eq!(
            render(Signal::Failed("no record".to_string())).as_deref(),
            Some(UNKNOWN_PROTECTED)
        );
    }
}
