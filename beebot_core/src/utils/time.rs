//! Human-readable time formatting for conversation lists.

use chrono::{DateTime, Utc};

/// Buckets a timestamp for display in the conversation list.
///
/// - "Today" / "Yesterday"
/// - "N days ago" within the last week
/// - an absolute date beyond that
///
/// Derived on every render, never persisted.
pub fn date_bucket(timestamp: DateTime<Utc>) -> String {
    let days = (Utc::now().date_naive() - timestamp.date_naive()).num_days();

    match days {
        i64::MIN..=0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        2..=6 => format!("{} days ago", days),
        _ => timestamp.format("%b %-d, %Y").to_string(),
    }
}
