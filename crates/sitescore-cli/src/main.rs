//! `sitescore` command-line front end.

mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use output::Styled;
use sitescore::capability::{HttpInference, Lemmatizer};
use sitescore::domain::registered_domain;
use sitescore::{HttpClient, ScanConfig, Scanner, TrackerRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "sitescore",
    version,
    about = "Privacy and security score for a website"
)]
struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    json: bool,
    #[arg(long, global = true, value_name = "FILE", help = "JSON config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, value_name = "URL", help = "Tracker dataset URL")]
    tracker_list: Option<String>,
    #[arg(short, long, global = true, help = "Debug logging on stderr")]
    verbose: bool,
    #[arg(long, global = true, help = "Log as JSON lines")]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan one website and print its report.
    Scan {
        url: String,
        #[arg(long, value_name = "YEAR", help = "Year domain ages are measured against")]
        reference_year: Option<i32>,
        #[arg(long, help = "Skip loading the tracker dataset")]
        no_trackers: bool,
    },
    /// Show which company, if any, owns a tracker domain.
    Tracker { domain: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let mut config = ScanConfig::load(cli.config.as_deref())?;
    if let Some(url) = &cli.tracker_list {
        config.tracker_list_url = url.clone();
    }

    match cli.command {
        Commands::Scan {
            url,
            reference_year,
            no_trackers,
        } => {
            if reference_year.is_some() {
                config.reference_year = reference_year;
            }
            scan(config, &url, no_trackers, cli.json).await
        }
        Commands::Tracker { domain } => tracker(config, &domain, cli.json).await,
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose { "sitescore=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Bare hosts are scanned over HTTPS.
fn normalize_target(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with("http") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

async fn load_registry(config: &ScanConfig, client: &HttpClient) -> Arc<TrackerRegistry> {
    let registry = TrackerRegistry::load(
        client,
        &config.tracker_list_url,
        config.registry_timeout_ms,
    )
    .await;
    Arc::new(registry)
}

async fn scan(config: ScanConfig, input: &str, no_trackers: bool, json: bool) -> Result<()> {
    let url = normalize_target(input);
    let client = HttpClient::new(&config.user_agent).context("failed to build HTTP client")?;

    let registry = if no_trackers {
        Arc::new(TrackerRegistry::empty())
    } else {
        load_registry(&config, &client).await
    };
    info!(entries = registry.len(), "tracker registry ready");

    let inference = Arc::new(
        HttpInference::new(config.inference.clone(), &config.user_agent)
            .context("failed to set up inference")?,
    );
    let scanner = Scanner::builder(config)
        .pages(Arc::new(client))
        .tracker_registry(registry)
        .summarizer(inference.clone())
        .classifier(inference)
        .normalizer(Arc::new(Lemmatizer::new()))
        .build()?;

    let report = scanner.analyze(&url).await;
    if json {
        output::print_json(&serde_json::to_value(&report)?);
    } else {
        print!("{}", output::render_report(&Styled::new(), &report));
    }
    Ok(())
}

async fn tracker(config: ScanConfig, input: &str, json: bool) -> Result<()> {
    let client = HttpClient::new(&config.user_agent).context("failed to build HTTP client")?;
    let registry = load_registry(&config, &client).await;

    let domain = input.trim().trim_end_matches('.').to_lowercase();
    let registered = registered_domain(&domain);
    let company = registry
        .lookup(&registered)
        .or_else(|| registry.lookup(&domain));

    if json {
        output::print_json(&serde_json::json!({
            "domain": domain,
            "registered_domain": registered,
            "company": company,
            "registry_entries": registry.len(),
        }));
        return Ok(());
    }

    let s = Styled::new();
    match company {
        Some(company) => println!("  {} {domain} belongs to {}", s.warn_sym(), s.bold(&company)),
        None if registry.is_empty() => {
            println!("  {} tracker dataset unavailable", s.fail_sym())
        }
        None => println!("  {} {domain} is not a known tracker", s.ok_sym()),
    }
    Ok(())
}
