use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Datelike;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{Value, json};
use tracing::{debug, trace, warn};
use url::Url;

use crate::adapters::rate_limiter::RateLimiter;
use crate::adapters::shared::ApiKeyManager;
use crate::config::types::{ClientConfig, GraphQLHashes, PaginationMode};
use crate::domain::listing::{ContinuationToken, ResultPage};
use crate::domain::probe::SearchProbe;
use crate::domain::search_criteria::SearchCriteria;
use crate::error::{PositioningError, Result};
use crate::ports::calendar_provider::CalendarProvider;
use crate::ports::page_fetcher::PageFetcher;

use super::{cursor, search};

const RETRY_BACKOFF: Duration = Duration::from_millis(500);

pub struct AirbnbGraphQLClient {
    http: Client,
    rate_limiter: RateLimiter,
    base_url: String,
    locale: String,
    currency: String,
    hashes: GraphQLHashes,
    pagination: PaginationMode,
    items_per_grid: u32,
    max_retries: u32,
    api_key_manager: Arc<ApiKeyManager>,
}

/// Build the HTTP client shared by the GraphQL client and the API key manager.
pub fn build_http_client(config: &ClientConfig) -> std::result::Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .cookie_store(true);
    if let Some(ref proxy_url) = config.proxy_url {
        builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
    }
    builder.build()
}

impl AirbnbGraphQLClient {
    pub fn new(
        config: &ClientConfig,
        api_key_manager: Arc<ApiKeyManager>,
    ) -> std::result::Result<Self, reqwest::Error> {
        Ok(Self {
            http: build_http_client(config)?,
            rate_limiter: RateLimiter::new(config.rate_limit_per_second),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            locale: config.locale.clone(),
            currency: config.currency.clone(),
            hashes: config.graphql_hashes.clone(),
            pagination: config.pagination,
            items_per_grid: config.items_per_grid,
            max_retries: config.max_retries,
            api_key_manager,
        })
    }

    fn endpoint(&self, operation_name: &str, hash: &str) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}/api/v3/{operation_name}/{hash}",
            self.base_url
        ))?;
        url.query_pairs_mut()
            .append_pair("operationName", operation_name)
            .append_pair("locale", &self.locale)
            .append_pair("currency", &self.currency);
        Ok(url)
    }

    /// Send a request built by `build`, retrying transient failures with linear backoff.
    async fn execute(
        &self,
        operation_name: &str,
        build: impl Fn() -> RequestBuilder + Send + Sync,
    ) -> Result<Value> {
        let mut attempt = 0;
        loop {
            match self.execute_once(operation_name, &build).await {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let backoff = RETRY_BACKOFF * attempt;
                    warn!(
                        operation = operation_name,
                        attempt,
                        error = %e,
                        "Transient GraphQL failure, retrying in {backoff:?}"
                    );
                    tokio::time::sleep(backoff).await;
                }
                result => return result,
            }
        }
    }

    async fn execute_once(
        &self,
        operation_name: &str,
        build: &(impl Fn() -> RequestBuilder + Send + Sync),
    ) -> Result<Value> {
        let api_key = self.api_key_manager.get_api_key().await?;

        self.rate_limiter.wait().await;
        let response = build()
            .header("X-Airbnb-Api-Key", &api_key)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .header("Accept-Language", &self.locale)
            .header("Cache-Control", "no-cache")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PositioningError::RateLimited);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            // The key may have rotated; pick up a fresh one on the next call.
            self.api_key_manager.invalidate().await;
        }
        if !status.is_success() {
            return Err(PositioningError::UpstreamStatus {
                operation: operation_name.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        debug!(
            operation = operation_name,
            body_len = body.len(),
            "GraphQL response received"
        );
        trace!(operation = operation_name, body = %body, "GraphQL raw response");

        serde_json::from_str(&body).map_err(|e| PositioningError::Parse {
            reason: format!("GraphQL {operation_name} JSON parse error: {e}"),
        })
    }

    /// Execute a GraphQL POST request with a persisted query hash.
    async fn graphql_post(
        &self,
        operation_name: &str,
        hash: &str,
        variables: &Value,
    ) -> Result<Value> {
        let url = self.endpoint(operation_name, hash)?;
        let body = json!({
            "operationName": operation_name,
            "variables": variables,
            "extensions": {
                "persistedQuery": {
                    "version": 1,
                    "sha256Hash": hash,
                }
            }
        });
        debug!(url = %url, "GraphQL POST request");
        self.execute(operation_name, || self.http.post(url.clone()).json(&body))
            .await
    }

    /// Execute a GraphQL GET request with a persisted query hash.
    async fn graphql_get(
        &self,
        operation_name: &str,
        hash: &str,
        variables: &Value,
    ) -> Result<Value> {
        let extensions = json!({
            "persistedQuery": {
                "version": 1,
                "sha256Hash": hash,
            }
        });
        let mut url = self.endpoint(operation_name, hash)?;
        url.query_pairs_mut()
            .append_pair("variables", &variables.to_string())
            .append_pair("extensions", &extensions.to_string());
        debug!(url = %url, "GraphQL GET request");
        self.execute(operation_name, || self.http.get(url.clone()))
            .await
    }
}

#[async_trait]
impl PageFetcher for AirbnbGraphQLClient {
    fn initial_token(&self) -> ContinuationToken {
        match self.pagination {
            PaginationMode::Cursor => ContinuationToken::first_cursor(),
            PaginationMode::Offset => ContinuationToken::Offset(0),
        }
    }

    async fn fetch_page(
        &self,
        criteria: &SearchCriteria,
        probe: &SearchProbe,
        token: &ContinuationToken,
    ) -> Result<ResultPage> {
        let wire_cursor = cursor::wire_cursor(token);
        let variables =
            search::build_search_variables(criteria, probe, &wire_cursor, self.items_per_grid);
        let json = self
            .graphql_post("StaysSearch", &self.hashes.stays_search, &variables)
            .await?;
        let mut page = search::parse_search_page(&json)?;

        if let ContinuationToken::Offset(offset) = token {
            // Offsets are advanced locally from the row count.
            page.next = None;
            trace!(offset, rows = page.entries.len(), has_more = page.has_more, "Offset page parsed");
        }
        Ok(page)
    }
}

#[async_trait]
impl CalendarProvider for AirbnbGraphQLClient {
    async fn get_calendar(&self, room_id: &str, months: u32) -> Result<Value> {
        let today = chrono::Local::now().date_naive();
        let variables = json!({
            "request": {
                "count": months,
                "listingId": room_id,
                "month": today.month(),
                "year": today.year(),
            }
        });

        let json = self
            .graphql_get(
                "PdpAvailabilityCalendar",
                &self.hashes.pdp_availability_calendar,
                &variables,
            )
            .await?;

        Ok(json
            .pointer("/data/merlin/pdpAvailabilityCalendar/calendarMonths")
            .cloned()
            .unwrap_or(Value::Null))
    }
}
