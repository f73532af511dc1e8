use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use crate::domain::listing::{ContinuationToken, ListingEntry, ResultPage};
use crate::domain::probe::SearchProbe;
use crate::domain::search_criteria::SearchCriteria;
use crate::error::Result;
use crate::ports::calendar_provider::CalendarProvider;
use crate::ports::page_fetcher::PageFetcher;

type PageFn = Box<dyn Fn(&SearchProbe, &ContinuationToken) -> Result<ResultPage> + Send + Sync>;
type CalendarFn = Box<dyn Fn(&str, u32) -> Result<Value> + Send + Sync>;

pub struct MockPageFetcher {
    page_fn: Mutex<PageFn>,
    initial: ContinuationToken,
    calls: Mutex<Vec<(SearchProbe, ContinuationToken)>>,
}

impl Default for MockPageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPageFetcher {
    pub fn new() -> Self {
        Self {
            page_fn: Mutex::new(Box::new(|_, _| Ok(ResultPage::last(vec![])))),
            initial: ContinuationToken::first_cursor(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Serve `pages` in order, chained by cursors `p1`, `p2`, ...
    pub fn scripted(pages: Vec<Vec<ListingEntry>>) -> Self {
        Self::new().with_pages(move |_, token| {
            let index = match token {
                ContinuationToken::Cursor(c) if c.is_empty() => 0,
                ContinuationToken::Cursor(c) => c.trim_start_matches('p').parse().unwrap_or(usize::MAX),
                ContinuationToken::Offset(_) => usize::MAX,
            };
            let entries = pages.get(index).cloned().unwrap_or_default();
            let has_more = index + 1 < pages.len();
            Ok(ResultPage {
                entries,
                next: has_more.then(|| ContinuationToken::Cursor(format!("p{}", index + 1))),
                has_more,
            })
        })
    }

    #[must_use]
    pub fn with_pages(
        self,
        f: impl Fn(&SearchProbe, &ContinuationToken) -> Result<ResultPage> + Send + Sync + 'static,
    ) -> Self {
        *self.page_fn.lock().unwrap() = Box::new(f);
        self
    }

    #[must_use]
    pub fn with_initial_token(mut self, token: ContinuationToken) -> Self {
        self.initial = token;
        self
    }

    pub fn tokens(&self) -> Vec<ContinuationToken> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, token)| token.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PageFetcher for MockPageFetcher {
    fn initial_token(&self) -> ContinuationToken {
        self.initial.clone()
    }

    async fn fetch_page(
        &self,
        _criteria: &SearchCriteria,
        probe: &SearchProbe,
        token: &ContinuationToken,
    ) -> Result<ResultPage> {
        self.calls.lock().unwrap().push((*probe, token.clone()));
        let f = self.page_fn.lock().unwrap();
        f(probe, token)
    }
}

pub struct MockCalendarProvider {
    calendar_fn: Mutex<CalendarFn>,
}

impl Default for MockCalendarProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCalendarProvider {
    pub fn new() -> Self {
        Self {
            calendar_fn: Mutex::new(Box::new(|_, _| Ok(Value::Array(vec![])))),
        }
    }

    #[must_use]
    pub fn with_calendar(
        self,
        f: impl Fn(&str, u32) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        *self.calendar_fn.lock().unwrap() = Box::new(f);
        self
    }
}

#[async_trait]
impl CalendarProvider for MockCalendarProvider {
    async fn get_calendar(&self, room_id: &str, months: u32) -> Result<Value> {
        let f = self.calendar_fn.lock().unwrap();
        f(room_id, months)
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn make_probe(check_in: &str, nights: u32) -> SearchProbe {
    SearchProbe::starting(date(check_in), nights).unwrap()
}

pub fn make_entry(id: &str) -> ListingEntry {
    ListingEntry {
        listing_id: id.to_string(),
        display_name: format!("Listing {id}"),
        price: Some(100.0),
        source_index: 0,
    }
}

/// Entries with ids `start..end`.
pub fn make_entries(start: u32, end: u32) -> Vec<ListingEntry> {
    (start..end).map(|i| make_entry(&i.to_string())).collect()
}

/// A one-month calendar payload from `(date, available, min_nights)` triples.
pub fn calendar_json(days: &[(&str, bool, u32)]) -> Value {
    let days: Vec<Value> = days
        .iter()
        .map(|(d, available, min_nights)| {
            serde_json::json!({
                "calendarDate": d,
                "available": available,
                "minNights": min_nights,
                "maxNights": 365,
            })
        })
        .collect();
    serde_json::json!([{ "days": days }])
}
