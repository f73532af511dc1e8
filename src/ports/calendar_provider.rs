use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Raw calendar for `room_id`: a list of month blocks, each with a `days` list.
    async fn get_calendar(&self, room_id: &str, months: u32) -> Result<Value>;
}
