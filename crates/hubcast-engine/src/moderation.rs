// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Restriction checks with caching, plus duration parsing for the
//! moderation command surface.

use std::time::Duration;

use tracing::debug;

use hubcast_core::{FastStore, HubcastError, RestrictionKind, UserId};
use hubcast_storage::{queries, Database};

const RESTRICT_CACHE_TTL: Duration = Duration::from_secs(300);

/// The user's effective restriction, if any. Banned or currently-muted
/// users are dropped at ingress.
///
/// Uses a fast-store cache (`restrict:{user}`) with a 5-min TTL; a cache
/// failure falls through to the database.
pub async fn is_user_restricted(
    db: &Database,
    store: &dyn FastStore,
    user: UserId,
) -> Result<Option<RestrictionKind>, HubcastError> {
    let cache_key = format!("restrict:{}", user.0);
    if let Ok(Some(cached)) = store.get(&cache_key).await {
        return Ok(match cached.as_str() {
            "mute" => Some(RestrictionKind::Mute),
            "ban" => Some(RestrictionKind::Ban),
            _ => None,
        });
    }

    let restriction = queries::restrictions::active_restriction(db, user).await?;
    let value = match restriction.as_ref().map(|r| r.kind) {
        Some(RestrictionKind::Mute) => "mute",
        Some(RestrictionKind::Ban) => "ban",
        None => "none",
    };
    if let Err(e) = store.set(&cache_key, value, RESTRICT_CACHE_TTL).await {
        debug!(user_id = user.0, error = %e, "restriction cache write failed");
    }
    Ok(restriction.map(|r| r.kind))
}

/// Delete the cached restriction after a moderation action.
pub async fn invalidate_cache(store: &dyn FastStore, user: UserId) {
    let _ = store.delete(&format!("restrict:{}", user.0)).await;
}

/// Parse a human-friendly duration like `30m`, `2h`, `7d`, `1d12h`,
/// `24h30m`. Returns `None` on invalid or zero input.
pub fn parse_duration(text: &str) -> Option<chrono::Duration> {
    let text = text.trim().to_ascii_lowercase();
    if text.is_empty() {
        return None;
    }

    let mut days = 0i64;
    let mut hours = 0i64;
    let mut minutes = 0i64;
    let mut number = String::new();
    let mut seen = [false; 3];

    for c in text.chars() {
        if c.is_ascii_digit() {
            number.push(c);
            continue;
        }
        let value: i64 = number.parse().ok()?;
        number.clear();
        match c {
            // Units must appear at most once, in d/h/m order.
            'd' if !seen[0] && !seen[1] && !seen[2] => {
                seen[0] = true;
                days = value;
            }
            'h' if !seen[1] && !seen[2] => {
                seen[1] = true;
                hours = value;
            }
            'm' if !seen[2] => {
                seen[2] = true;
                minutes = value;
            }
            _ => return None,
        }
    }
    if !number.is_empty() {
        return None; // Trailing digits without a unit.
    }
    if days == 0 && hours == 0 && minutes == 0 {
        return None;
    }
    Some(chrono::Duration::days(days) + chrono::Duration::hours(hours) + chrono::Duration::minutes(minutes))
}

/// Format a duration as `2d 6h 30m`, omitting zero components.
pub fn format_duration(d: chrono::Duration) -> String {
    let total = d.num_seconds();
    if total <= 0 {
        return "0m".to_string();
    }
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if parts.is_empty() {
        "0m".to_string()
    } else {
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use hubcast_core::MemoryStore;
    use tempfile::tempdir;

    #[test]
    fn parse_simple_and_combined_durations() {
        assert_eq!(parse_duration("30m"), Some(chrono::Duration::minutes(30)));
        assert_eq!(parse_duration("2h"), Some(chrono::Duration::hours(2)));
        assert_eq!(parse_duration("7d"), Some(chrono::Duration::days(7)));
        assert_eq!(
            parse_duration("1d12h"),
            Some(chrono::Duration::hours(36))
        );
        assert_eq!(
            parse_duration("24h30m"),
            Some(chrono::Duration::minutes(24 * 60 + 30))
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("abc"), None);
        assert_eq!(parse_duration("0m"), None);
        assert_eq!(parse_duration("12"), None);
        assert_eq!(parse_duration("1m2h"), None, "units out of order");
        assert_eq!(parse_duration("1h1h"), None, "repeated unit");
    }

    #[test]
    fn format_round_trip() {
        assert_eq!(format_duration(chrono::Duration::minutes(30)), "30m");
        assert_eq!(
            format_duration(chrono::Duration::seconds(2 * 86_400 + 6 * 3_600 + 30 * 60)),
            "2d 6h 30m"
        );
        assert_eq!(format_duration(chrono::Duration::zero()), "0m");
    }

    #[tokio::test]
    async fn restriction_check_caches_and_invalidates() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("moderation.db");
        let db = hubcast_storage::Database::open(db_path.to_str().unwrap())
            .await
            .unwrap();
        let store = Arc::new(MemoryStore::new());

        assert!(is_user_restricted(&db, store.as_ref(), UserId(7))
            .await
            .unwrap()
            .is_none());

        queries::restrictions::add(&db, UserId(7), RestrictionKind::Ban, UserId(1), None)
            .await
            .unwrap();
        // Cached "none" still answers until invalidated.
        assert!(is_user_restricted(&db, store.as_ref(), UserId(7))
            .await
            .unwrap()
            .is_none());

        invalidate_cache(store.as_ref(), UserId(7)).await;
        assert_eq!(
            is_user_restricted(&db, store.as_ref(), UserId(7))
                .await
                .unwrap(),
            Some(RestrictionKind::Ban)
        );
    }
}
