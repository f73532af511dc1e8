use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::listing::{ListingEntry, ResultPage, normalize_listing_id};
use crate::domain::probe::SearchProbe;
use crate::domain::search_criteria::SearchCriteria;
use crate::error::PositioningError;
use crate::ports::page_fetcher::PageFetcher;

#[derive(Debug, Clone)]
pub struct AggregationSettings {
    /// Listings per results page, as the upstream groups them.
    pub page_size: usize,
    /// Safety bound on the number of page fetches per probe.
    pub max_pages: u32,
    /// Pause between consecutive page fetches.
    pub page_delay: Duration,
    /// Stop paging once the target listing has been seen.
    pub stop_when_found: bool,
    /// Treat a page of exactly `page_size` rows as "more available" even when the
    /// feed says otherwise. A full final page then costs one extra, empty fetch.
    pub full_page_implies_more: bool,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            page_size: 18,
            max_pages: 20,
            page_delay: Duration::ZERO,
            stop_when_found: false,
            full_page_implies_more: false,
        }
    }
}

/// The deduplicated result sequence for one probe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchAggregate {
    pub listings: Vec<ListingEntry>,
    /// Paging stopped at the page bound or on a failed fetch.
    pub terminated_early: bool,
    pub pages_fetched: u32,
    /// Why paging was aborted, if a fetch failed.
    pub failure: Option<String>,
}

impl SearchAggregate {
    pub fn contains(&self, listing_id: &str) -> bool {
        let id = normalize_listing_id(listing_id);
        self.listings.iter().any(|l| l.listing_id == id)
    }
}

/// Walk the result feed for `probe` page by page and collect every listing once, in
/// upstream order.
///
/// Each iteration stops on, in order: an empty page, a page without more results,
/// the `max_pages` bound, or (with `stop_when_found`) the target having been seen.
/// Since the first occurrence of a listing fixes its rank, stopping early on the
/// target never changes the target's rank.
///
/// A failed fetch ends paging for this probe and is reported in
/// [`SearchAggregate::failure`] together with everything collected so far.
pub async fn aggregate_search(
    fetcher: &dyn PageFetcher,
    criteria: &SearchCriteria,
    probe: &SearchProbe,
    target_id: Option<&str>,
    settings: &AggregationSettings,
) -> SearchAggregate {
    let target = target_id.map(normalize_listing_id);
    let mut seen: HashSet<String> = HashSet::new();
    let mut aggregate = SearchAggregate::default();
    let mut token = fetcher.initial_token();
    let mut received = 0usize;

    loop {
        if aggregate.pages_fetched > 0 && !settings.page_delay.is_zero() {
            tokio::time::sleep(settings.page_delay).await;
        }

        let page_number = aggregate.pages_fetched + 1;
        debug!(probe = %probe, page = page_number, token = %token, "Fetching results page");

        let ResultPage {
            entries,
            next,
            has_more,
        } = match fetcher.fetch_page(criteria, probe, &token).await {
            Ok(page) => page,
            Err(e) => {
                warn!(probe = %probe, page = page_number, error = %e, "Page fetch failed, aborting probe");
                let failure = PositioningError::PageFetch {
                    page: page_number,
                    reason: e.to_string(),
                };
                aggregate.terminated_early = true;
                aggregate.failure = Some(failure.to_string());
                return aggregate;
            }
        };
        aggregate.pages_fetched = page_number;

        if entries.is_empty() {
            debug!(page = page_number, "Empty page, end of results");
            break;
        }

        let page_len = entries.len();
        let before = aggregate.listings.len();
        for mut entry in entries {
            entry.source_index = received;
            received += 1;
            entry.listing_id = normalize_listing_id(&entry.listing_id);
            if entry.listing_id.is_empty() {
                continue;
            }
            if seen.insert(entry.listing_id.clone()) {
                aggregate.listings.push(entry);
            }
        }
        debug!(
            page = page_number,
            rows = page_len,
            new = aggregate.listings.len() - before,
            total = aggregate.listings.len(),
            "Page merged"
        );

        let more = has_more || (settings.full_page_implies_more && page_len == settings.page_size);
        if !more {
            break;
        }

        if page_number >= settings.max_pages {
            warn!(
                probe = %probe,
                max_pages = settings.max_pages,
                "Page limit reached before the end of results"
            );
            aggregate.terminated_early = true;
            break;
        }

        if settings.stop_when_found
            && let Some(ref target) = target
            && seen.contains(target)
        {
            debug!(target = %target, page = page_number, "Target found, stopping early");
            break;
        }

        // A continuation handed out by the feed always wins over a local offset.
        token = match next.or_else(|| token.advanced_by(page_len)) {
            Some(next) => next,
            None => {
                warn!(
                    page = page_number,
                    "Feed reported more results but gave no continuation"
                );
                break;
            }
        };
    }

    aggregate
}
