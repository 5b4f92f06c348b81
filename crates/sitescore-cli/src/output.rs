//! Terminal rendering for scan reports: colors, status symbols and JSON.

use sitescore::{Category, Level, ScanReport};
use std::io::IsTerminal;

/// Check if color output is enabled.
pub fn color_enabled() -> bool {
    // https://no-color.org/
    if std::env::var_os("NO_COLOR").is_some() || std::env::var_os("SITESCORE_NO_COLOR").is_some()
    {
        return false;
    }
    std::io::stdout().is_terminal()
}

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Colored string builder.
pub struct Styled {
    use_color: bool,
}

impl Styled {
    pub fn new() -> Self {
        Self {
            use_color: color_enabled(),
        }
    }

    pub fn plain() -> Self {
        Self { use_color: false }
    }

    pub fn ok_sym(&self) -> &'static str {
        if self.use_color {
            "\x1b[32m\u{2713}\x1b[0m"
        } else {
            "OK"
        }
    }

    pub fn fail_sym(&self) -> &'static str {
        if self.use_color {
            "\x1b[31m\u{2717}\x1b[0m"
        } else {
            "!!"
        }
    }

    pub fn warn_sym(&self) -> &'static str {
        if self.use_color {
            "\x1b[33m\u{26a0}\x1b[0m"
        } else {
            "??"
        }
    }

    pub fn info_sym(&self) -> &'static str {
        if self.use_color {
            "\x1b[34m\u{25cb}\x1b[0m"
        } else {
            "--"
        }
    }

    pub fn symbol(&self, level: Level) -> &'static str {
        match level {
            Level::Ok => self.ok_sym(),
            Level::Warn => self.warn_sym(),
            Level::Fail => self.fail_sym(),
            Level::Info => self.info_sym(),
        }
    }

    fn paint(&self, code: &str, s: &str) -> String {
        if self.use_color {
            format!("{code}{s}{RESET}")
        } else {
            s.to_string()
        }
    }

    pub fn green(&self, s: &str) -> String {
        self.paint(GREEN, s)
    }

    pub fn red(&self, s: &str) -> String {
        self.paint(RED, s)
    }

    pub fn yellow(&self, s: &str) -> String {
        self.paint(YELLOW, s)
    }

    pub fn dim(&self, s: &str) -> String {
        self.paint(DIM, s)
    }

    pub fn bold(&self, s: &str) -> String {
        self.paint(BOLD, s)
    }
}

impl Default for Styled {
    fn default() -> Self {
        Self::new()
    }
}

fn label(category: Category) -> &'static str {
    match category {
        Category::Status => "Status:",
        Category::Https => "HTTPS:",
        Category::Trackers => "Trackers:",
        Category::PolicyFound => "Policy:",
        Category::PolicySummary => "Summary:",
        Category::PolicyAi => "Policy risk:",
        Category::DomainAge => "Domain age:",
        Category::Registrar => "Registrar:",
        Category::Final => "Result:",
    }
}

/// Render the report as aligned check lines. Continuation lines of a
/// multi-line finding are indented under the value column.
pub fn render_report(s: &Styled, report: &ScanReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "  {} {}\n\n",
        s.bold("sitescore"),
        s.dim(&report.url)
    ));
    for (category, finding) in &report.findings {
        if *category == Category::Final {
            continue;
        }
        let mut lines = finding.text.lines();
        let first = lines.next().unwrap_or_default();
        out.push_str(&format!(
            "    {} {:<14} {first}\n",
            s.symbol(finding.level),
            label(*category)
        ));
        for line in lines {
            out.push_str(&format!("{:22}{line}\n", ""));
        }
    }
    if let Some(last) = report.finding(Category::Final) {
        let painted = match last.level {
            Level::Ok => s.green(&last.text),
            Level::Warn => s.yellow(&last.text),
            _ => s.red(&last.text),
        };
        out.push_str(&format!("\n  {}\n", s.bold(&painted)));
    }
    out
}

/// Print JSON output to stdout.
pub fn print_json(value: &serde_json::Value) {
    if let Ok(s) = serde_json::to_string_pretty(value) {
        println!("{s}");
    }
}
