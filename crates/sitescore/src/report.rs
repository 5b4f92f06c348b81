//! Scan report: score, grade and one finding per category.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub const STARTING_SCORE: i32 = 100;
pub const INSECURE_TRANSPORT_PENALTY: i32 = 20;
pub const PER_TRACKER_PENALTY: i32 = 8;
pub const MISSING_POLICY_PENALTY: i32 = 15;
pub const HIGH_RISK_POLICY_PENALTY: i32 = 30;
pub const MODERATE_RISK_POLICY_PENALTY: i32 = 15;

/// Report sections. Declaration order is report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Status,
    Https,
    Trackers,
    PolicyFound,
    PolicySummary,
    PolicyAi,
    DomainAge,
    Registrar,
    Final,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Status,
        Category::Https,
        Category::Trackers,
        Category::PolicyFound,
        Category::PolicySummary,
        Category::PolicyAi,
        Category::DomainAge,
        Category::Registrar,
        Category::Final,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Status => "status",
            Category::Https => "https",
            Category::Trackers => "trackers",
            Category::PolicyFound => "policy_found",
            Category::PolicySummary => "policy_summary",
            Category::PolicyAi => "policy_ai",
            Category::DomainAge => "domain_age",
            Category::Registrar => "registrar",
            Category::Final => "final",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a finding should read to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Ok,
    Warn,
    Fail,
    Info,
}

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub level: Level,
    pub text: String,
}

/// Letter grade bucketed from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Grade {
    A,
    B,
    C,
}

impl Grade {
    /// `>= 80` A, `60..=79` B, anything lower C.
    pub fn from_score(score: i32) -> Self {
        if score >= 80 {
            Grade::A
        } else if score >= 60 {
            Grade::B
        } else {
            Grade::C
        }
    }

    pub fn risk(self) -> &'static str {
        match self {
            Grade::A => "Low Risk",
            Grade::B => "Moderate Risk",
            Grade::C => "High Risk",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
        };
        write!(f, "{letter} ({})", self.risk())
    }
}

/// Result of analyzing one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub url: String,
    pub score: i32,
    pub grade: Grade,
    pub reachable: bool,
    pub findings: BTreeMap<Category, Finding>,
}

impl ScanReport {
    /// Report for a site that never answered: score 0, status only.
    pub fn unreachable(url: &str) -> Self {
        let mut findings = BTreeMap::new();
        findings.insert(
            Category::Status,
            Finding {
                level: Level::Fail,
                text: "Website not reachable".to_string(),
            },
        );
        Self {
            url: url.to_string(),
            score: 0,
            grade: Grade::from_score(0),
            reachable: false,
            findings,
        }
    }

    pub fn finding(&self, category: Category) -> Option<&Finding> {
        self.findings.get(&category)
    }

    /// Finding text for `category`, if the scan got that far.
    pub fn text(&self, category: Category) -> Option<&str> {
        self.finding(category).map(|f| f.text.as_str())
    }

    /// `(score, category -> text)` in report order.
    pub fn into_parts(self) -> (i32, Vec<(&'static str, String)>) {
        let entries = self
            .findings
            .into_iter()
            .map(|(c, f)| (c.as_str(), f.text))
            .collect();
        (self.score, entries)
    }
}

/// Accumulates deductions and findings while a scan runs.
#[derive(Debug)]
pub(crate) struct ReportBuilder {
    url: String,
    score: i32,
    findings: BTreeMap<Category, Finding>,
}

impl ReportBuilder {
    pub(crate) fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            score: STARTING_SCORE,
            findings: BTreeMap::new(),
        }
    }

    pub(crate) fn deduct(&mut self, points: i32) {
        self.score -= points;
    }

    pub(crate) fn record(&mut self, category: Category, level: Level, text: impl Into<String>) {
        self.findings.insert(
            category,
            Finding {
                level,
                text: text.into(),
            },
        );
    }

    pub(crate) fn score(&self) -> i32 {
        self.score
    }

    /// Add the `final` line and freeze the report.
    pub(crate) fn finish(mut self) -> ScanReport {
        let grade = Grade::from_score(self.score);
        let level = match grade {
            Grade::A => Level::Ok,
            Grade::B => Level::Warn,
            Grade::C => Level::Fail,
        };
        let text = format!("Privacy Score: {}/100 - Grade: {grade}", self.score);
        self.record(Category::Final, level, text);
        ScanReport {
            url: self.url,
            score: self.score,
            grade,
            reachable: true,
            findings: self.findings,
        }
    }
}
