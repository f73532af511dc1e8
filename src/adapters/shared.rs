use std::time::{Duration, Instant};

use reqwest::Client;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{PositioningError, Result};

/// Caches the public web API key that every Airbnb GraphQL call must carry.
///
/// The key is scraped from the homepage once and reused until `cache_ttl`
/// elapses, so a run of many probes costs a single homepage request.
pub struct ApiKeyManager {
    http: Client,
    base_url: String,
    cache_ttl: Duration,
    cached_key: RwLock<Option<(String, Instant)>>,
}

impl ApiKeyManager {
    pub fn new(http: Client, base_url: String, cache_secs: u64) -> Self {
        Self {
            http,
            base_url,
            cache_ttl: Duration::from_secs(cache_secs),
            cached_key: RwLock::new(None),
        }
    }

    pub async fn get_api_key(&self) -> Result<String> {
        {
            let guard = self.cached_key.read().await;
            if let Some((ref key, fetched_at)) = *guard
                && fetched_at.elapsed() < self.cache_ttl
            {
                return Ok(key.clone());
            }
        }

        debug!(base_url = %self.base_url, "Fetching Airbnb API key from homepage");

        let response = self.http.get(&self.base_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PositioningError::Parse {
                reason: format!("homepage returned HTTP {status} while fetching API key"),
            });
        }
        let html = response.text().await?;

        let key = extract_api_key(&html).ok_or_else(|| PositioningError::Parse {
            reason: "could not extract API key from Airbnb homepage".into(),
        })?;

        *self.cached_key.write().await = Some((key.clone(), Instant::now()));
        Ok(key)
    }

    /// Drop the cached key so the next call refetches it.
    pub async fn invalidate(&self) {
        *self.cached_key.write().await = None;
    }
}

/// Pull the API key out of the homepage HTML.
///
/// Prefers the `"api_config":{"key":"..."}` block and falls back to the first
/// bare `"key":"..."` pair.
pub fn extract_api_key(html: &str) -> Option<String> {
    const API_CONFIG: &str = "\"api_config\":{\"key\":\"";
    const BARE_KEY: &str = "\"key\":\"";

    [API_CONFIG, BARE_KEY]
        .iter()
        .find_map(|marker| quoted_value_after(html, marker))
}

fn quoted_value_after(html: &str, marker: &str) -> Option<String> {
    let start = html.find(marker)? + marker.len();
    let rest = &html[start..];
    let end = rest.find('"')?;
    let key = &rest[..end];
    if key.is_empty() {
        return None;
    }
    Some(key.to_string())
}
