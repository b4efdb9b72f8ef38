use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Stable classification every failure is reported under.
#[derive(Serialize, PartialEq, Eq, Hash, Clone, Copy, Debug)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    UnsupportedPlatform,
    AuthRequired,
    NotFound,
    RateLimited,
    Timeout,
    NoMediaFound,
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::UnsupportedPlatform => "unsupported platform",
            ErrorKind::AuthRequired => "authentication required",
            ErrorKind::NotFound => "not found",
            ErrorKind::RateLimited => "rate limited",
            ErrorKind::Timeout => "timeout",
            ErrorKind::NoMediaFound => "no media found",
            ErrorKind::Unknown => "unknown error",
        };
        f.write_str(s)
    }
}

/// Error of a single strategy or network operation.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("extraction deadline exceeded")]
    DeadlineExceeded,

    #[error("extraction cancelled")]
    Cancelled,

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("media resolver failed: {0}")]
    Resolver(String),

    #[error("media resolver unavailable: {0}")]
    ResolverUnavailable(String),

    #[error("identity source {source_name} is locked: {detail}")]
    IdentityLocked { source_name: String, detail: String },

    #[error("{0} answered with a login page")]
    LoginWall(String),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ExtractError {
    /// Errors after which no further strategy may run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExtractError::DeadlineExceeded | ExtractError::Cancelled)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::InvalidInput(_) | ExtractError::Url(_) => ErrorKind::InvalidInput,
            ExtractError::Timeout { .. } | ExtractError::DeadlineExceeded | ExtractError::Cancelled => {
                ErrorKind::Timeout
            }
            ExtractError::Http(e) if e.is_timeout() => ErrorKind::Timeout,
            ExtractError::Status { status, .. } => classify_status(*status),
            ExtractError::IdentityLocked { .. } | ExtractError::LoginWall(_) => ErrorKind::AuthRequired,
            ExtractError::ResolverUnavailable(_) | ExtractError::Json(_) => ErrorKind::Unknown,
            other => classify_message(&other.to_string()),
        }
    }
}

fn classify_status(status: u16) -> ErrorKind {
    match status {
        401 | 403 => ErrorKind::AuthRequired,
        404 | 410 => ErrorKind::NotFound,
        429 => ErrorKind::RateLimited,
        408 | 504 => ErrorKind::Timeout,
        _ => ErrorKind::Unknown,
    }
}

const TIMEOUT_MARKERS: &[&str] = &["timed out", "timeout"];
const RATE_MARKERS: &[&str] = &["rate limit", "rate-limit", "too many requests", "throttl"];
const AUTH_MARKERS: &[&str] = &[
    "private",
    "login",
    "log in",
    "sign in",
    "authenticat",
    "unable to extract user info",
    "cookies",
    "forbidden",
    "members-only",
    "age-restricted",
    "confirm your age",
];
const NOT_FOUND_MARKERS: &[&str] = &[
    "not found",
    "not available",
    "unavailable",
    "deleted",
    "removed",
    "does not exist",
    "no longer exists",
];

/// `HTTP Error 429`, `status 403`, `status code: 404`; bare digits are usually content ids
static STATUS_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:http error|status(?: code)?)\W{0,3}(\d{3})\b").unwrap());

/// Map free-form provider/subprocess error text onto the taxonomy.
/// The order matters: a timeout text often also names the page it could not reach.
pub fn classify_message(message: &str) -> ErrorKind {
    let lowered = message.to_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|m| lowered.contains(m));
    let status = STATUS_CODE
        .captures(&lowered)
        .and_then(|c| c[1].parse::<u16>().ok())
        .map(classify_status);
    if has(TIMEOUT_MARKERS) {
        ErrorKind::Timeout
    } else if has(RATE_MARKERS) || status == Some(ErrorKind::RateLimited) {
        ErrorKind::RateLimited
    } else if has(AUTH_MARKERS) || status == Some(ErrorKind::AuthRequired) {
        ErrorKind::AuthRequired
    } else if has(NOT_FOUND_MARKERS) || status == Some(ErrorKind::NotFound) {
        ErrorKind::NotFound
    } else {
        ErrorKind::Unknown
    }
}

pub fn suggestion_for(kind: ErrorKind) -> Option<&'static str> {
    Some(match kind {
        ErrorKind::InvalidInput => "Paste the full post link, starting with http:// or https://",
        ErrorKind::UnsupportedPlatform => {
            "Supported: Instagram, LinkedIn, X/Twitter, TikTok, Facebook, YouTube, Pinterest, Twitch"
        }
        ErrorKind::AuthRequired => {
            "The content is private or needs a login; try a public post, or sign in with a local browser and close it before retrying"
        }
        ErrorKind::NotFound => "Check that the link is correct and the post has not been deleted",
        ErrorKind::RateLimited => "The platform is throttling requests; wait a few minutes and retry",
        ErrorKind::Timeout => "The platform did not answer in time; retry or check your connection",
        ErrorKind::NoMediaFound => {
            "The post may be private, contain no downloadable media, or the platform changed its page structure"
        }
        ErrorKind::Unknown => "Retry with another post; if it keeps failing, update yt-dlp",
    })
}

/// Cut `message` to at most `max` characters, on a char boundary.
pub fn truncate_message(message: &str, max: usize) -> String {
    let trimmed = message.trim();
    match trimmed.char_indices().nth(max) {
        None => trimmed.to_string(),
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
    }
}
