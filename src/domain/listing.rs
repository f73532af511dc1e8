use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// One row of a search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingEntry {
    /// Normalized listing id, used as the deduplication key.
    pub listing_id: String,
    pub display_name: String,
    pub price: Option<f64>,
    /// Position among all rows received for the probe, duplicates included.
    pub source_index: usize,
}

/// Where the next page of results begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContinuationToken {
    /// Opaque cursor handed out by the upstream feed. Empty for the first page.
    Cursor(String),
    /// Plain numeric items offset.
    Offset(u32),
}

impl ContinuationToken {
    pub fn first_cursor() -> Self {
        Self::Cursor(String::new())
    }

    /// The token following a page of `received` rows, for offset-based feeds
    /// whose page did not hand out its own continuation.
    pub fn advanced_by(&self, received: usize) -> Option<Self> {
        match self {
            Self::Offset(offset) => {
                let received = u32::try_from(received).ok()?;
                Some(Self::Offset(offset.checked_add(received)?))
            }
            Self::Cursor(_) => None,
        }
    }
}

impl std::fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cursor(c) if c.is_empty() => write!(f, "cursor:<first>"),
            Self::Cursor(c) => write!(f, "cursor:{c}"),
            Self::Offset(n) => write!(f, "offset:{n}"),
        }
    }
}

/// A batch of listings as returned by one page fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultPage {
    pub entries: Vec<ListingEntry>,
    /// Continuation handed out by the feed, if any.
    pub next: Option<ContinuationToken>,
    pub has_more: bool,
}

impl ResultPage {
    pub fn last(entries: Vec<ListingEntry>) -> Self {
        Self {
            entries,
            next: None,
            has_more: false,
        }
    }
}

const ID_PREFIXES: [&str; 2] = ["DemandStayListing:", "StayListing:"];

/// Normalize a listing id as it appears in search results or user input.
///
/// Relay-style global ids (`base64("StayListing:123")`) are decoded, and the
/// `StayListing:` / `DemandStayListing:` prefixes are stripped.
pub fn normalize_listing_id(raw: &str) -> String {
    let trimmed = raw.trim();
    let decoded = decode_global_id(trimmed);
    let id = decoded.as_deref().unwrap_or(trimmed);
    ID_PREFIXES
        .iter()
        .find_map(|prefix| id.strip_prefix(prefix))
        .unwrap_or(id)
        .to_string()
}

fn decode_global_id(raw: &str) -> Option<String> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(raw)
        .ok()?;
    let text = String::from_utf8(bytes).ok()?;
    ID_PREFIXES
        .iter()
        .any(|prefix| text.starts_with(prefix))
        .then_some(text)
}
