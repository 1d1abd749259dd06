//! Formatting helpers for status output.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Format the time elapsed since `since` relative to `now`.
///
/// # Examples
/// ```
/// use awdl::utils::format_duration_ago;
/// use chrono::{Duration, Utc};
/// let now = Utc::now();
/// assert_eq!(format_duration_ago(now - Duration::minutes(5), now), "5m ago");
/// ```
pub fn format_duration_ago(since: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = now.signed_duration_since(since).num_seconds();
    if seconds < 60 {
        "just now".to_string()
    } else if seconds < 3600 {
        format!("{}m ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{}h ago", seconds / 3600)
    } else {
        format!("{}d ago", seconds / 86400)
    }
}

/// Format an interval the way the config file spells it ("500ms", "2s").
///
/// # Examples
/// ```
/// use awdl::utils::format_interval;
/// use std::time::Duration;
/// assert_eq!(format_interval(Duration::from_millis(1500)), "1500ms");
/// assert_eq!(format_interval(Duration::from_secs(2)), "2s");
/// ```
pub fn format_interval(interval: Duration) -> String {
    let millis = interval.as_millis();
    if millis % 1000 == 0 {
        format!("{}s", millis / 1000)
    } else {
        format!("{}ms", millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration_ago() {
        let now = Utc::now();
        let ago = |secs: i64| format_duration_ago(now - chrono::Duration::seconds(secs), now);
        assert_eq!(ago(0), "just now");
        assert_eq!(ago(59), "just now");
        assert_eq!(ago(60), "1m ago");
        assert_eq!(ago(3599), "59m ago");
        assert_eq!(ago(3600), "1h ago");
        assert_eq!(ago(86400 * 3), "3d ago");
    }

    #[test]
    fn test_format_duration_ago_future_timestamp() {
        let now = Utc::now();
        assert_eq!(
            format_duration_ago(now + chrono::Duration::seconds(30), now),
            "just now"
        );
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(Duration::from_secs(1)), "1s");
        assert_eq!(format_interval(Duration::from_millis(250)), "250ms");
        assert_eq!(format_interval(Duration::ZERO), "0s");
    }
}
