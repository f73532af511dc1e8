use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use airbnb_positioning::adapters::graphql::client::{AirbnbGraphQLClient, build_http_client};
use airbnb_positioning::adapters::shared::ApiKeyManager;
use airbnb_positioning::config::load_config;
use airbnb_positioning::config::types::Config;
use airbnb_positioning::domain::probe::SearchProbe;
use airbnb_positioning::domain::report::{RankStats, RunSummary};
use airbnb_positioning::domain::search_criteria::SearchCriteria;
use airbnb_positioning::error::PositioningError;
use airbnb_positioning::positioning::tracker::{PositionTracker, ProbeSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Track where a listing ranks in Airbnb search results across candidate stay dates.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Listing (room) id to look for
    #[arg(long, env = "ROOM_ID")]
    room_id: String,

    /// Airbnb search URL carrying `place_id`, `query` or map bounds
    #[arg(long, env = "SEARCH_URL")]
    search_url: String,

    /// Check-in date (YYYY-MM-DD); omit or pass 0 to pick dates from the calendar
    #[arg(long, env = "CHECKIN")]
    checkin: Option<String>,

    /// Check-out date (YYYY-MM-DD), required with --checkin
    #[arg(long, env = "CHECKOUT")]
    checkout: Option<String>,

    /// Path to the YAML config file
    #[arg(short, long, env = "CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[arg(long, env = "CURRENCY")]
    currency: Option<String>,

    #[arg(long, env = "LANGUAGE")]
    language: Option<String>,

    #[arg(long, env = "PROXY_URL")]
    proxy_url: Option<String>,

    #[arg(long, env = "RESULTS_PER_PAGE")]
    results_per_page: Option<u32>,

    #[arg(long, env = "DATES_PER_MONTH")]
    dates_per_month: Option<u32>,

    #[arg(long, env = "MONTHS_TO_CHECK")]
    months_to_check: Option<u32>,

    /// Take the first N available dates instead of the per-month selection
    #[arg(long, env = "MAX_DAYS")]
    max_days: Option<u32>,

    /// Seconds to wait between probes
    #[arg(long, env = "DELAY_BETWEEN_SEARCHES")]
    delay_between_searches: Option<f64>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    summary: &'a RunSummary,
    stats: RankStats,
}

fn find_config_path() -> PathBuf {
    let candidates = [PathBuf::from("config.yaml"), binary_dir().join("config.yaml")];

    for path in &candidates {
        if path.exists() {
            return path.clone();
        }
    }

    candidates[0].clone()
}

fn binary_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Fold command-line and environment overrides into the loaded config.
fn apply_overrides(args: &Args, config: &mut Config) -> Result<(), PositioningError> {
    if let Some(ref currency) = args.currency {
        config.client.currency.clone_from(currency);
    }
    if let Some(ref language) = args.language {
        config.client.locale.clone_from(language);
    }
    if let Some(ref proxy_url) = args.proxy_url {
        config.client.proxy_url = Some(proxy_url.clone()).filter(|p| !p.trim().is_empty());
    }
    if let Some(n) = args.results_per_page {
        config.run.results_per_page = n;
    }
    if let Some(n) = args.dates_per_month {
        config.run.dates_per_month = n;
    }
    if let Some(n) = args.months_to_check {
        config.run.months_to_check = n;
    }
    if let Some(n) = args.max_days {
        config.run.max_days = n;
    }
    if let Some(secs) = args.delay_between_searches {
        if !secs.is_finite() || secs < 0.0 {
            return Err(PositioningError::Config(format!(
                "delay between searches must be a non-negative number of seconds, got {secs}"
            )));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let delay_ms = (secs * 1000.0).round() as u64;
        config.run.probe_delay_ms = delay_ms;
    }
    Ok(())
}

fn parse_date(name: &str, raw: &str) -> Result<NaiveDate, PositioningError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
        PositioningError::InvalidParams {
            reason: format!("{name} {raw:?} is not a YYYY-MM-DD date: {e}"),
        }
    })
}

/// Manual dates when a check-in is given, otherwise the calendar.
fn probe_source(args: &Args) -> Result<ProbeSource, PositioningError> {
    let checkin = args
        .checkin
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty() && *c != "0");
    let Some(checkin) = checkin else {
        return Ok(ProbeSource::Calendar);
    };

    let checkout = args
        .checkout
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| PositioningError::InvalidParams {
            reason: "--checkout is required when --checkin is given".into(),
        })?;

    let probe = SearchProbe::between(
        parse_date("checkin", checkin)?,
        parse_date("checkout", checkout)?,
    )?;
    Ok(ProbeSource::Manual(probe))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr, stdout carries the report
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(find_config_path);
    let mut config = load_config(&config_path)?;
    apply_overrides(&args, &mut config)?;
    config.validate()?;

    let criteria = SearchCriteria::from_search_url(&args.search_url)
        .with_context(|| format!("invalid search URL {}", args.search_url))?;
    let source = probe_source(&args)?;

    tracing::info!(
        room_id = %args.room_id,
        search = %criteria,
        currency = %config.client.currency,
        locale = %config.client.locale,
        "Starting positioning run"
    );

    let api_key_manager = Arc::new(ApiKeyManager::new(
        build_http_client(&config.client).context("failed to build HTTP client")?,
        config.client.base_url.clone(),
        config.client.api_key_cache_secs,
    ));
    let client = Arc::new(
        AirbnbGraphQLClient::new(&config.client, api_key_manager)
            .context("failed to build GraphQL client")?,
    );
    let tracker = PositionTracker::new(client.clone(), client, config.run.tracker_settings());

    let today = chrono::Local::now().date_naive();
    let summary = tracker.run(&args.room_id, &criteria, &source, today).await?;

    match args.format {
        OutputFormat::Text => print!("{summary}"),
        OutputFormat::Json => {
            let report = JsonReport {
                summary: &summary,
                stats: summary.stats(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
