// SPDX-FileCopyrightText: 2026 Hubcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound body composition: content + alias tag + signature.
//!
//! Suffixes are never truncated; when the platform length cap would be
//! exceeded, the body is cut with an ellipsis instead.

use hubcast_core::HubcastError;
use hubcast_storage::{queries, Database};

/// Platform cap for text messages, in characters.
pub const TEXT_MAX_LEN: usize = 4096;
/// Platform cap for media captions, in characters.
pub const CAPTION_MAX_LEN: usize = 1024;

const SEPARATOR: &str = "\n\n";
const ELLIPSIS: &str = "...";

/// Read the configured signature, if enabled.
///
/// `signature_text` wins over `signature_url`; with neither set there is
/// no signature.
pub async fn load(db: &Database) -> Result<Option<String>, HubcastError> {
    if !queries::config::get_bool(db, "signature_enabled", true).await? {
        return Ok(None);
    }
    let text = queries::config::get_value(db, "signature_text").await?;
    let url = queries::config::get_value(db, "signature_url").await?;
    Ok(text.filter(|t| !t.is_empty()).or(url.filter(|u| !u.is_empty())))
}

/// Compose the outbound body from the content and the suffixes, capped
/// at `max_len` characters.
///
/// Rules:
/// - with no content and no suffixes, there is no body (`None`);
/// - suffixes (alias tag, then signature) are joined by blank lines and
///   survive intact;
/// - only the content is truncated, with a trailing ellipsis.
pub fn compose_body(
    content: Option<&str>,
    alias_tag: Option<&str>,
    signature: Option<&str>,
    max_len: usize,
) -> Option<String> {
    let content = content.filter(|c| !c.is_empty());
    let suffix = [alias_tag, signature]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(SEPARATOR);

    let Some(body) = content else {
        if suffix.is_empty() {
            return None;
        }
        return Some(truncate_chars(&suffix, max_len));
    };
    if suffix.is_empty() {
        if char_len(body) <= max_len {
            return Some(body.to_string());
        }
        let cut = take_chars(body, max_len.saturating_sub(char_len(ELLIPSIS)));
        return Some(format!("{cut}{ELLIPSIS}"));
    }

    let full = format!("{body}{SEPARATOR}{suffix}");
    if char_len(&full) <= max_len {
        return Some(full);
    }

    let reserved = char_len(SEPARATOR) + char_len(&suffix) + char_len(ELLIPSIS);
    if reserved >= max_len {
        // Suffixes alone exceed the cap; send them truncated and drop the body.
        return Some(truncate_chars(&suffix, max_len));
    }
    let cut = take_chars(body, max_len - reserved);
    Some(format!("{cut}{ELLIPSIS}{SEPARATOR}{suffix}"))
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn take_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn truncate_chars(s: &str, max_len: usize) -> String {
    if char_len(s) <= max_len {
        s.to_string()
    } else {
        take_chars(s, max_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_to_send_yields_none() {
        assert_eq!(compose_body(None, None, None, 4096), None);
    }

    #[test]
    fn suffixes_without_content() {
        let body = compose_body(None, Some("— u-a3x7k2"), Some("via hubcast"), 1024);
        assert_eq!(body.as_deref(), Some("— u-a3x7k2\n\nvia hubcast"));
    }

    #[test]
    fn short_body_keeps_everything() {
        let body = compose_body(Some("hi"), Some("— u-a3x7k2"), None, 4096).unwrap();
        assert_eq!(body, "hi\n\n— u-a3x7k2");
    }

    #[test]
    fn long_body_is_cut_but_suffixes_survive() {
        let long = "x".repeat(5000);
        let body = compose_body(Some(&long), Some("— u-a3x7k2"), Some("sig"), 4096).unwrap();
        assert_eq!(body.chars().count(), 4096);
        assert!(body.ends_with("...\n\n— u-a3x7k2\n\nsig"));
        assert!(body.starts_with("xxx"));
    }

    #[test]
    fn body_only_truncation_uses_ellipsis() {
        let long = "y".repeat(1100);
        let body = compose_body(Some(&long), None, None, 1024).unwrap();
        assert_eq!(body.chars().count(), 1024);
        assert!(body.ends_with("..."));
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        let long = "ü".repeat(1100);
        let body = compose_body(Some(&long), None, None, 1024).unwrap();
        assert_eq!(body.chars().count(), 1024);
    }

    #[test]
    fn oversized_suffix_is_clipped_alone() {
        let sig = "s".repeat(2000);
        let body = compose_body(Some("hello"), None, Some(&sig), 1024).unwrap();
        assert_eq!(body.chars().count(), 1024);
        assert!(body.starts_with("sss"));
    }
}
