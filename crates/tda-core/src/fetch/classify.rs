use chrono::{DateTime, Utc};

use super::result::FetchStatus;

const HTTP_NOT_MODIFIED: u16 = 304;

/// Status implied by the HTTP response alone, before the body is looked at.
pub fn classify_response(conditional: bool, status_code: u16) -> FetchStatus {
    if conditional && status_code == HTTP_NOT_MODIFIED {
        FetchStatus::NotModified
    } else if (200..300).contains(&status_code) {
        FetchStatus::Success
    } else {
        FetchStatus::Error
    }
}

/// True when a freshly parsed header timestamp has not advanced past the prior one.
///
/// A prior timestamp in the future (relative to `fetch_time`) is not trusted,
/// and an equal timestamp counts as unchanged.
pub fn is_unchanged(
    prior: Option<DateTime<Utc>>,
    current: Option<DateTime<Utc>>,
    fetch_time: DateTime<Utc>,
) -> bool {
    match (prior, current) {
        (Some(prior), Some(current)) => prior <= fetch_time && current <= prior,
        _ => false,
    }
}
