#![allow(clippy::cast_precision_loss)]

use serde::{Deserialize, Serialize};

use crate::domain::listing::{ListingEntry, normalize_listing_id};

/// Where a listing landed in the aggregated results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankPosition {
    /// 1-based rank in the deduplicated result order.
    pub rank: usize,
    pub page: usize,
    pub position_on_page: usize,
}

impl RankPosition {
    /// Page and position for a 1-based `rank`, or `None` for a zero rank or page size.
    pub fn from_rank(rank: usize, page_size: usize) -> Option<Self> {
        if rank == 0 || page_size == 0 {
            return None;
        }
        Some(Self {
            rank,
            page: (rank - 1) / page_size + 1,
            position_on_page: (rank - 1) % page_size + 1,
        })
    }
}

/// Price range of one results page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBucket {
    pub page: usize,
    pub min_price: f64,
    pub max_price: f64,
    pub priced_count: usize,
    pub unpriced_count: usize,
}

/// Locate `target_id` in `listings`. Not finding it is a normal outcome.
pub fn locate(listings: &[ListingEntry], target_id: &str, page_size: usize) -> Option<RankPosition> {
    let target = normalize_listing_id(target_id);
    let index = listings
        .iter()
        .position(|entry| normalize_listing_id(&entry.listing_id) == target)?;
    RankPosition::from_rank(index + 1, page_size)
}

/// Split `listings` into pages of `page_size` and report the price range of every
/// page that has at least one priced entry.
pub fn bucket_prices(listings: &[ListingEntry], page_size: usize) -> Vec<PriceBucket> {
    if page_size == 0 {
        return Vec::new();
    }
    listings
        .chunks(page_size)
        .enumerate()
        .filter_map(|(i, chunk)| price_bucket(i + 1, chunk))
        .collect()
}

/// The price range of the page a ranked listing landed on.
pub fn page_price_range(
    listings: &[ListingEntry],
    position: &RankPosition,
    page_size: usize,
) -> Option<PriceBucket> {
    let chunk = listings.chunks(page_size.max(1)).nth(position.page - 1)?;
    price_bucket(position.page, chunk)
}

fn price_bucket(page: usize, chunk: &[ListingEntry]) -> Option<PriceBucket> {
    let prices: Vec<f64> = chunk
        .iter()
        .filter_map(|e| e.price)
        .filter(|p| p.is_finite())
        .collect();
    let min_price = prices.iter().copied().reduce(f64::min)?;
    let max_price = prices.iter().copied().reduce(f64::max)?;
    Some(PriceBucket {
        page,
        min_price,
        max_price,
        priced_count: prices.len(),
        unpriced_count: chunk.len() - prices.len(),
    })
}
