use base64::Engine as _;
use serde::Deserialize;

use crate::domain::listing::ContinuationToken;

/// The JSON payload StaysSearch accepts as a cursor for offset paging.
#[derive(Debug, Deserialize)]
struct OffsetCursor {
    items_offset: u32,
}

/// Encode an items offset as the base64 cursor StaysSearch understands.
pub fn encode_offset(items_offset: u32) -> String {
    let json = format!(r#"{{"section_offset":0,"items_offset":{items_offset},"version":1}}"#);
    base64::engine::general_purpose::STANDARD.encode(json)
}

/// The items offset carried by a cursor, if it is an offset cursor.
pub fn decode_offset(cursor: &str) -> Option<u32> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(cursor.trim())
        .ok()?;
    serde_json::from_slice::<OffsetCursor>(&bytes)
        .ok()
        .map(|c| c.items_offset)
}

/// The wire value of a continuation token. Empty for the first cursor page.
pub fn wire_cursor(token: &ContinuationToken) -> String {
    match token {
        ContinuationToken::Cursor(cursor) => cursor.clone(),
        ContinuationToken::Offset(0) => String::new(),
        ContinuationToken::Offset(offset) => encode_offset(*offset),
    }
}
