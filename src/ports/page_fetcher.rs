use async_trait::async_trait;

use crate::domain::listing::{ContinuationToken, ResultPage};
use crate::domain::probe::SearchProbe;
use crate::domain::search_criteria::SearchCriteria;
use crate::error::Result;

/// One page of search results for a probe.
///
/// Implementations own the upstream wire protocol (filters, cursor encoding,
/// persisted-query hashes); the aggregator only sees pages and tokens.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// The token for the first page.
    fn initial_token(&self) -> ContinuationToken {
        ContinuationToken::first_cursor()
    }

    async fn fetch_page(
        &self,
        criteria: &SearchCriteria,
        probe: &SearchProbe,
        token: &ContinuationToken,
    ) -> Result<ResultPage>;
}
