use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::{Value, json};

use airbnb_positioning::adapters::graphql::client::AirbnbGraphQLClient;
use airbnb_positioning::adapters::graphql::cursor::encode_offset;
use airbnb_positioning::adapters::shared::ApiKeyManager;
use airbnb_positioning::config::types::{ClientConfig, PaginationMode};
use airbnb_positioning::domain::availability::build_availability;
use airbnb_positioning::domain::listing::ContinuationToken;
use airbnb_positioning::domain::probe::SearchProbe;
use airbnb_positioning::domain::search_criteria::SearchCriteria;
use airbnb_positioning::error::PositioningError;
use airbnb_positioning::ports::calendar_provider::CalendarProvider;
use airbnb_positioning::ports::page_fetcher::PageFetcher;
use airbnb_positioning::positioning::aggregator::{AggregationSettings, aggregate_search};

use wiremock::matchers::{body_string_contains, header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fast_client_config(base_url: &str) -> ClientConfig {
    ClientConfig {
        base_url: base_url.to_string(),
        rate_limit_per_second: 100.0, // fast for tests
        request_timeout_secs: 5,
        max_retries: 0,
        ..Default::default()
    }
}

fn test_api_key_manager(base_url: &str) -> Arc<ApiKeyManager> {
    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .unwrap();
    Arc::new(ApiKeyManager::new(http, base_url.to_string(), 86400))
}

async fn mount_api_key_mock(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<script>window.__config = {"api_config":{"key":"testkey123"}}</script>"#,
        ))
        .mount(server)
        .await;
}

async fn build_client_with(server: &MockServer, config: ClientConfig) -> AirbnbGraphQLClient {
    mount_api_key_mock(server).await;
    AirbnbGraphQLClient::new(&config, test_api_key_manager(&server.uri())).unwrap()
}

async fn build_client(server: &MockServer) -> AirbnbGraphQLClient {
    build_client_with(server, fast_client_config(&server.uri())).await
}

fn criteria() -> SearchCriteria {
    SearchCriteria {
        place_id: Some("ChIJdubai".into()),
        query: Some("Dubai".into()),
        ..Default::default()
    }
}

fn probe() -> SearchProbe {
    SearchProbe::starting(NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(), 2).unwrap()
}

// ---------------------------------------------------------------------------
// JSON fixtures
// ---------------------------------------------------------------------------

fn search_page_json(ids: &[&str], next_cursor: Option<&str>) -> Value {
    let rows: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({
                "listing": {"id": format!("StayListing:{id}"), "name": format!("Listing {id}")},
                "structuredDisplayPrice": {"primaryLine": {"price": "AED 450"}},
            })
        })
        .collect();
    json!({
        "data": {"presentation": {"staysSearch": {"results": {
            "searchResults": rows,
            "paginationInfo": {"nextPageCursor": next_cursor},
        }}}}
    })
}

fn calendar_response_json() -> Value {
    json!({
        "data": {"merlin": {"pdpAvailabilityCalendar": {"calendarMonths": [{
            "month": 2,
            "year": 2026,
            "days": [
                {"calendarDate": "2026-02-03", "available": true, "minNights": 2, "maxNights": 30},
                {"calendarDate": "2026-02-04", "available": false, "minNights": 2, "maxNights": 30},
                {"calendarDate": "2026-02-05", "available": true, "minNights": 1, "maxNights": 30},
            ],
        }]}}}
    })
}

// ---------------------------------------------------------------------------
// StaysSearch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn search_follows_cursor_across_pages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/api/v3/StaysSearch/"))
        .and(body_string_contains(r#""cursor":"""#))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(search_page_json(&["1", "2", "3"], Some("page2"))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/api/v3/StaysSearch/"))
        .and(body_string_contains(r#""cursor":"page2""#))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page_json(&["3", "4"], None)))
        .expect(1)
        .mount(&server)
        .await;

    let client = build_client(&server).await;
    let aggregate = aggregate_search(
        &client,
        &criteria(),
        &probe(),
        Some("4"),
        &AggregationSettings::default(),
    )
    .await;

    let ids: Vec<&str> = aggregate.listings.iter().map(|l| l.listing_id.as_str()).collect();
    assert_eq!(ids, ["1", "2", "3", "4"]);
    assert_eq!(aggregate.pages_fetched, 2);
    assert!(!aggregate.terminated_early);
    assert!(aggregate.failure.is_none());
    assert_eq!(aggregate.listings[3].source_index, 4);
}

#[tokio::test]
async fn search_sends_api_key_locale_and_currency() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/api/v3/StaysSearch/"))
        .and(header("X-Airbnb-Api-Key", "testkey123"))
        .and(query_param("operationName", "StaysSearch"))
        .and(query_param("locale", "fr"))
        .and(query_param("currency", "EUR"))
        .and(body_string_contains("ChIJdubai"))
        .and(body_string_contains("2026-02-12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page_json(&["9"], None)))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig {
        locale: "fr".into(),
        currency: "EUR".into(),
        ..fast_client_config(&server.uri())
    };
    let client = build_client_with(&server, config).await;
    let page = client
        .fetch_page(&criteria(), &probe(), &client.initial_token())
        .await
        .unwrap();
    assert_eq!(page.entries.len(), 1);
    assert_eq!(page.entries[0].listing_id, "9");
    assert_eq!(page.entries[0].price, Some(450.0));
}

#[tokio::test]
async fn offset_mode_encodes_item_offsets() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/api/v3/StaysSearch/"))
        .and(body_string_contains(r#""cursor":"""#))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page_json(&["1", "2"], None)))
        .expect(1)
        .mount(&server)
        .await;
    let second_cursor = format!(r#""cursor":"{}""#, encode_offset(2));
    Mock::given(method("POST"))
        .and(path_regex(r"^/api/v3/StaysSearch/"))
        .and(body_string_contains(second_cursor.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page_json(&["3"], None)))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig {
        pagination: PaginationMode::Offset,
        items_per_grid: 2,
        ..fast_client_config(&server.uri())
    };
    let client = build_client_with(&server, config).await;
    assert_eq!(client.initial_token(), ContinuationToken::Offset(0));

    let settings = AggregationSettings {
        page_size: 2,
        full_page_implies_more: true,
        ..Default::default()
    };
    let aggregate = aggregate_search(&client, &criteria(), &probe(), None, &settings).await;
    let ids: Vec<&str> = aggregate.listings.iter().map(|l| l.listing_id.as_str()).collect();
    assert_eq!(ids, ["1", "2", "3"]);
    assert_eq!(aggregate.pages_fetched, 2);
}

#[tokio::test]
async fn offset_mode_trusts_feed_when_full_page_heuristic_is_off() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/api/v3/StaysSearch/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_page_json(&["1", "2"], None)))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig {
        pagination: PaginationMode::Offset,
        items_per_grid: 2,
        ..fast_client_config(&server.uri())
    };
    let client = build_client_with(&server, config).await;

    let page = client
        .fetch_page(&criteria(), &probe(), &client.initial_token())
        .await
        .unwrap();
    assert!(!page.has_more);
    assert_eq!(page.next, None);

    let settings = AggregationSettings {
        page_size: 2,
        ..Default::default()
    };
    let aggregate = aggregate_search(&client, &criteria(), &probe(), None, &settings).await;
    assert_eq!(aggregate.listings.len(), 2);
    assert_eq!(aggregate.pages_fetched, 1);
}

#[tokio::test]
async fn server_error_aborts_probe_with_partial_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/api/v3/StaysSearch/"))
        .and(body_string_contains(r#""cursor":"""#))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(search_page_json(&["1", "2"], Some("page2"))),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/api/v3/StaysSearch/"))
        .and(body_string_contains(r#""cursor":"page2""#))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = build_client(&server).await;
    let aggregate = aggregate_search(
        &client,
        &criteria(),
        &probe(),
        None,
        &AggregationSettings::default(),
    )
    .await;

    assert_eq!(aggregate.listings.len(), 2);
    assert!(aggregate.terminated_early);
    let failure = aggregate.failure.unwrap();
    assert!(failure.contains("Page 2"));
    assert!(failure.contains("HTTP 500"));
}

#[tokio::test]
async fn server_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/api/v3/StaysSearch/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let config = ClientConfig {
        max_retries: 1,
        ..fast_client_config(&server.uri())
    };
    let client = build_client_with(&server, config).await;
    let err = client
        .fetch_page(&criteria(), &probe(), &client.initial_token())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PositioningError::UpstreamStatus { status: 503, .. }
    ));
}

#[tokio::test]
async fn forbidden_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/api/v3/StaysSearch/"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig {
        max_retries: 3,
        ..fast_client_config(&server.uri())
    };
    let client = build_client_with(&server, config).await;
    let result = client
        .fetch_page(&criteria(), &probe(), &client.initial_token())
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn rate_limited_response_maps_to_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/api/v3/StaysSearch/"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = build_client(&server).await;
    let err = client
        .fetch_page(&criteria(), &probe(), &client.initial_token())
        .await
        .unwrap_err();
    assert!(matches!(err, PositioningError::RateLimited));
}

#[tokio::test]
async fn invalid_json_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/api/v3/StaysSearch/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>blocked</html>"))
        .mount(&server)
        .await;

    let client = build_client(&server).await;
    let err = client
        .fetch_page(&criteria(), &probe(), &client.initial_token())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("JSON parse error"));
}

// ---------------------------------------------------------------------------
// PdpAvailabilityCalendar
// ---------------------------------------------------------------------------

#[tokio::test]
async fn calendar_returns_month_blocks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/v3/PdpAvailabilityCalendar/"))
        .and(query_param("operationName", "PdpAvailabilityCalendar"))
        .respond_with(ResponseTemplate::new(200).set_body_json(calendar_response_json()))
        .expect(1)
        .mount(&server)
        .await;

    let client = build_client(&server).await;
    let raw = client.get_calendar("42", 12).await.unwrap();
    assert!(raw.is_array());

    let index = build_availability(&raw).unwrap();
    assert_eq!(index.len(), 3);
    assert_eq!(index.available_count(), 2);
    let day = index
        .get(NaiveDate::from_ymd_opt(2026, 2, 3).unwrap())
        .unwrap();
    assert_eq!(day.min_nights, 2);
    assert_eq!(day.max_nights, 30);
}

#[tokio::test]
async fn calendar_without_months_is_null() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/v3/PdpAvailabilityCalendar/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .mount(&server)
        .await;

    let client = build_client(&server).await;
    let raw = client.get_calendar("42", 12).await.unwrap();
    assert!(raw.is_null());
    assert!(matches!(
        build_availability(&raw),
        Err(PositioningError::MalformedCalendar { .. })
    ));
}
