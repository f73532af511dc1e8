use thiserror::Error;

#[derive(Error, Debug)]
pub enum PositioningError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to parse response: {reason}")]
    Parse { reason: String },

    #[error("Malformed calendar payload: {reason}")]
    MalformedCalendar { reason: String },

    #[error("No available future dates for room {room_id}")]
    NoAvailability { room_id: String },

    #[error("Page {page} fetch failed: {reason}")]
    PageFetch { page: u32, reason: String },

    #[error("Invalid search parameters: {reason}")]
    InvalidParams { reason: String },

    #[error("Rate limit exceeded, try again later")]
    RateLimited,

    #[error("{operation} returned HTTP {status}")]
    UpstreamStatus { operation: String, status: u16 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

impl PositioningError {
    /// Whether a retry of the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited => true,
            Self::UpstreamStatus { status, .. } => *status >= 500,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, PositioningError>;
