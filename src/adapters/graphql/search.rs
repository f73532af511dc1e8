use serde_json::{Value, json};

use crate::domain::listing::{ContinuationToken, ListingEntry, ResultPage, normalize_listing_id};
use crate::domain::probe::SearchProbe;
use crate::domain::search_criteria::SearchCriteria;
use crate::error::{PositioningError, Result};

const TREATMENT_FLAGS: [&str; 3] = [
    "feed_map_decouple_m11_treatment",
    "stays_search_rehydration_treatment_desktop",
    "stays_search_rehydration_treatment_moweb",
];

const RESULTS_PATHS: [&str; 2] = [
    "/data/presentation/staysSearch/results",
    "/data/presentation/explore/sections/sectionIndependentData/staysSearch",
];

fn filter(name: &str, value: impl Into<String>) -> Value {
    json!({"filterName": name, "filterValues": [value.into()]})
}

/// Build GraphQL variables for one `StaysSearch` page.
pub fn build_search_variables(
    criteria: &SearchCriteria,
    probe: &SearchProbe,
    cursor: &str,
    items_per_grid: u32,
) -> Value {
    let mut raw_params = vec![
        filter("cdnCacheSafe", "false"),
        filter("channel", "EXPLORE"),
        filter("checkin", probe.check_in.format("%Y-%m-%d").to_string()),
        filter("checkout", probe.check_out.format("%Y-%m-%d").to_string()),
        filter("datePickerType", "calendar"),
        filter("flexibleTripLengths", "one_week"),
        filter("itemsPerGrid", items_per_grid.to_string()),
        filter("priceFilterInputType", "0"),
        filter("priceFilterNumNights", probe.nights.to_string()),
        filter("refinementPaths", "/homes"),
        filter("screenSize", "large"),
        filter("searchByMap", "false"),
        filter("tabId", "home_tab"),
        filter("version", "1.8.3"),
    ];

    if let Some(ref place_id) = criteria.place_id {
        raw_params.push(filter("placeId", place_id.as_str()));
    }
    raw_params.push(filter("query", criteria.query.clone().unwrap_or_default()));
    if let Some(b) = criteria.bounds {
        raw_params.push(filter("neLat", b.ne_lat.to_string()));
        raw_params.push(filter("neLng", b.ne_lng.to_string()));
        raw_params.push(filter("swLat", b.sw_lat.to_string()));
        raw_params.push(filter("swLng", b.sw_lng.to_string()));
    }
    if let Some(adults) = criteria.adults {
        raw_params.push(filter("adults", adults.to_string()));
    }

    json!({
        "staysSearchRequest": {
            "cursor": cursor,
            "maxMapItems": 9999,
            "requestedPageType": "STAYS_SEARCH",
            "metadataOnly": false,
            "source": "structured_search_input_header",
            "searchType": "filter_change",
            "treatmentFlags": TREATMENT_FLAGS,
            "rawParams": raw_params,
        },
        "staysMapSearchRequestV2": {
            "cursor": cursor,
            "requestedPageType": "STAYS_SEARCH",
            "metadataOnly": false,
            "source": "structured_search_input_header",
            "searchType": "filter_change",
            "treatmentFlags": TREATMENT_FLAGS,
            "rawParams": raw_params,
        },
        "includeMapResults": true,
        "isLeanTreatment": false,
    })
}

/// Parse one `StaysSearch` response into a result page.
///
/// Rows keep their upstream order, including rows whose id cannot be read, so that
/// offsets computed from the page length stay aligned with the feed.
pub fn parse_search_page(json: &Value) -> Result<ResultPage> {
    let Some(results) = RESULTS_PATHS.iter().find_map(|p| json.pointer(p)) else {
        return Err(PositioningError::Parse {
            reason: graphql_error_message(json).map_or_else(
                || "StaysSearch: could not find search results".to_string(),
                |msg| format!("StaysSearch: {msg}"),
            ),
        });
    };

    let rows = results
        .get("searchResults")
        .and_then(Value::as_array)
        .ok_or_else(|| PositioningError::Parse {
            reason: "StaysSearch: could not find searchResults array".into(),
        })?;

    let entries: Vec<ListingEntry> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| parse_row(row, i))
        .collect();

    let pagination = results.get("paginationInfo");
    let next = pagination
        .and_then(|p| p.get("nextPageCursor"))
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
        .map(|c| ContinuationToken::Cursor(c.to_string()));
    let has_next_page = pagination
        .and_then(|p| p.get("hasNextPage"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    Ok(ResultPage {
        has_more: next.is_some() || has_next_page,
        entries,
        next,
    })
}

fn parse_row(row: &Value, index: usize) -> ListingEntry {
    let listing = row
        .get("listing")
        .or_else(|| row.pointer("/demandStayListing"))
        .unwrap_or(row);

    let raw_id = listing
        .get("id")
        .and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_default();

    let display_name = listing
        .get("name")
        .or_else(|| listing.get("title"))
        .or_else(|| row.get("title"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    ListingEntry {
        listing_id: normalize_listing_id(&raw_id),
        display_name,
        price: extract_price(row),
        source_index: index,
    }
}

fn extract_price(row: &Value) -> Option<f64> {
    const DISPLAY_PRICE_PATHS: [&str; 4] = [
        "/structuredDisplayPrice/primaryLine/discountedPrice",
        "/structuredDisplayPrice/primaryLine/price",
        "/pricingQuote/structuredStayDisplayPrice/primaryLine/discountedPrice",
        "/pricingQuote/structuredStayDisplayPrice/primaryLine/price",
    ];

    DISPLAY_PRICE_PATHS
        .iter()
        .filter_map(|p| row.pointer(p).and_then(Value::as_str))
        .find_map(extract_price_number)
        .or_else(|| row.pointer("/pricingQuote/rate/amount").and_then(Value::as_f64))
}

/// Extract a numeric price from strings like "$120", "AED 1,250", "€95.50".
fn extract_price_number(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse().ok()
}

fn graphql_error_message(json: &Value) -> Option<String> {
    json.pointer("/errors/0/message")
        .and_then(Value::as_str)
        .map(String::from)
}
