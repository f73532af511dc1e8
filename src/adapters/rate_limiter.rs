use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces outbound requests at least `min_interval` apart.
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(requests_per_second: f64) -> Self {
        let min_interval = if requests_per_second > 0.0 && requests_per_second.is_finite() {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            tracing::warn!(
                "Rate limiter initialized with non-positive rate ({requests_per_second} req/s), no rate limiting applied"
            );
            Duration::ZERO
        };
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until the next request may go out, then claim the slot.
    pub async fn wait(&self) {
        // Held across the sleep so concurrent callers queue up in order.
        let mut last = self.last_request.lock().await;
        if let Some(last_time) = *last {
            let ready_at = last_time + self.min_interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}
