use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::date_selector::{MonthPolicy, NightsPolicy, ProbeSelection};
use crate::error::{PositioningError, Result};
use crate::positioning::aggregator::AggregationSettings;
use crate::positioning::tracker::TrackerSettings;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub run: RunConfig,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.client.validate()?;
        self.run.validate()
    }
}

/// How the search feed is paged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationMode {
    /// Follow the opaque `nextPageCursor` handed out with each page.
    #[default]
    Cursor,
    /// Encode a numeric items offset into the cursor ourselves.
    Offset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NightsMode {
    #[default]
    FixedMinimum,
    FlexibleMaximum,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_second: f64,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub proxy_url: Option<String>,
    #[serde(default = "default_api_key_cache_secs")]
    pub api_key_cache_secs: u64,
    #[serde(default)]
    pub pagination: PaginationMode,
    #[serde(default = "default_items_per_grid")]
    pub items_per_grid: u32,
    #[serde(default)]
    pub graphql_hashes: GraphQLHashes,
}

/// Persisted query hashes for Airbnb's internal GraphQL API.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraphQLHashes {
    #[serde(default = "default_stays_search_hash")]
    pub stays_search: String,
    #[serde(default = "default_pdp_availability_calendar_hash")]
    pub pdp_availability_calendar: String,
}

impl Default for GraphQLHashes {
    fn default() -> Self {
        Self {
            stays_search: default_stays_search_hash(),
            pdp_availability_calendar: default_pdp_availability_calendar_hash(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_timeout(),
            max_retries: default_retries(),
            rate_limit_per_second: default_rate_limit(),
            locale: default_locale(),
            currency: default_currency(),
            proxy_url: None,
            api_key_cache_secs: default_api_key_cache_secs(),
            pagination: PaginationMode::default(),
            items_per_grid: default_items_per_grid(),
            graphql_hashes: GraphQLHashes::default(),
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        non_empty("client.base_url", &self.base_url)?;
        non_empty("client.locale", &self.locale)?;
        non_empty("client.currency", &self.currency)?;
        non_empty("client.graphql_hashes.stays_search", &self.graphql_hashes.stays_search)?;
        non_empty(
            "client.graphql_hashes.pdp_availability_calendar",
            &self.graphql_hashes.pdp_availability_calendar,
        )?;
        positive("client.request_timeout_secs", self.request_timeout_secs)?;
        positive("client.items_per_grid", u64::from(self.items_per_grid))?;
        if !self.rate_limit_per_second.is_finite() || self.rate_limit_per_second < 0.0 {
            return Err(PositioningError::Config(
                "client.rate_limit_per_second must be a non-negative number".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    #[serde(default = "default_results_per_page")]
    pub results_per_page: u32,
    #[serde(default = "default_dates_per_month")]
    pub dates_per_month: u32,
    #[serde(default = "default_months_to_check")]
    pub months_to_check: u32,
    #[serde(default)]
    pub month_policy: MonthPolicy,
    #[serde(default)]
    pub nights_policy: NightsMode,
    /// Upper bound on nights under the flexible-maximum policy.
    #[serde(default = "default_max_nights")]
    pub max_nights: u32,
    /// First-N-dates mode when non-zero.
    #[serde(default)]
    pub max_days: u32,
    #[serde(default = "default_calendar_months")]
    pub calendar_months: u32,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    #[serde(default = "default_probe_delay_ms")]
    pub probe_delay_ms: u64,
    #[serde(default)]
    pub stop_when_found: bool,
    #[serde(default)]
    pub full_page_implies_more: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            results_per_page: default_results_per_page(),
            dates_per_month: default_dates_per_month(),
            months_to_check: default_months_to_check(),
            month_policy: MonthPolicy::default(),
            nights_policy: NightsMode::default(),
            max_nights: default_max_nights(),
            max_days: 0,
            calendar_months: default_calendar_months(),
            max_pages: default_max_pages(),
            page_delay_ms: default_page_delay_ms(),
            probe_delay_ms: default_probe_delay_ms(),
            stop_when_found: false,
            full_page_implies_more: false,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        positive("run.results_per_page", u64::from(self.results_per_page))?;
        positive("run.dates_per_month", u64::from(self.dates_per_month))?;
        positive("run.months_to_check", u64::from(self.months_to_check))?;
        positive("run.max_nights", u64::from(self.max_nights))?;
        positive("run.calendar_months", u64::from(self.calendar_months))?;
        positive("run.max_pages", u64::from(self.max_pages))?;
        Ok(())
    }

    pub fn nights(&self) -> NightsPolicy {
        match self.nights_policy {
            NightsMode::FixedMinimum => NightsPolicy::FixedMinimum,
            NightsMode::FlexibleMaximum => NightsPolicy::FlexibleMaximum {
                max_nights: self.max_nights,
            },
        }
    }

    pub fn selection(&self) -> ProbeSelection {
        ProbeSelection {
            dates_per_month: self.dates_per_month,
            months_to_check: self.months_to_check,
            month_policy: self.month_policy,
            nights_policy: self.nights(),
        }
    }

    pub fn aggregation(&self) -> AggregationSettings {
        AggregationSettings {
            page_size: self.results_per_page as usize,
            max_pages: self.max_pages,
            page_delay: Duration::from_millis(self.page_delay_ms),
            stop_when_found: self.stop_when_found,
            full_page_implies_more: self.full_page_implies_more,
        }
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            selection: self.selection(),
            max_days: self.max_days,
            calendar_months: self.calendar_months,
            aggregation: self.aggregation(),
            probe_delay: Duration::from_millis(self.probe_delay_ms),
        }
    }
}

fn positive(name: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(PositioningError::Config(format!("{name} must be positive")));
    }
    Ok(())
}

fn non_empty(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PositioningError::Config(format!("{name} must not be empty")));
    }
    Ok(())
}

fn default_base_url() -> String {
    "https://www.airbnb.com".into()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into()
}

fn default_timeout() -> u64 {
    60
}

fn default_retries() -> u32 {
    1
}

fn default_rate_limit() -> f64 {
    2.0
}

fn default_locale() -> String {
    "en".into()
}

fn default_currency() -> String {
    "AED".into()
}

fn default_api_key_cache_secs() -> u64 {
    86400 // 24 hours
}

fn default_items_per_grid() -> u32 {
    50
}

fn default_stays_search_hash() -> String {
    "9f945886dcc032b9ef4ba770d9132eb0aa78053296b5405483944c229617b00b".into()
}

fn default_pdp_availability_calendar_hash() -> String {
    "8f08e03c7bd16fcad3c92a3592c19a8b559a0d0855a84028d1163d4733ed9ade".into()
}

fn default_results_per_page() -> u32 {
    18
}

fn default_dates_per_month() -> u32 {
    3
}

fn default_months_to_check() -> u32 {
    3
}

fn default_max_nights() -> u32 {
    7
}

fn default_calendar_months() -> u32 {
    12
}

fn default_max_pages() -> u32 {
    20
}

fn default_page_delay_ms() -> u64 {
    500
}

fn default_probe_delay_ms() -> u64 {
    1500
}
