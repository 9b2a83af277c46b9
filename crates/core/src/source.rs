//! Source URL shape accepted for new jobs.
//!
//! Only the YouTube domain family is supported; the downloader adapter
//! re-checks with the same rule before spawning anything.

use std::sync::OnceLock;

use regex_lite::Regex;

use crate::error::StoreError;

static SOURCE_URL: OnceLock<Regex> = OnceLock::new();

fn source_url_regex() -> &'static Regex {
    SOURCE_URL.get_or_init(|| {
        Regex::new(r"^(https?://)?((www|m|music)\.)?(youtube\.com|youtu\.be)/\S+$")
            .expect("source URL pattern compiles")
    })
}

/// Returns true when `url` is a YouTube watch/share link.
pub fn is_supported_source(url: &str) -> bool {
    source_url_regex().is_match(url.trim())
}

/// Validate a job-creation URL, returning the trimmed URL on success.
pub fn validate_source_url(url: Option<&str>) -> Result<String, StoreError> {
    let url = url.map(str::trim).unwrap_or_default();
    if url.is_empty() {
        return Err(StoreError::validation("YouTube URL is required"));
    }
    if !is_supported_source(url) {
        return Err(StoreError::validation("Invalid YouTube URL"));
    }
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_youtube_family() {
        for url in [
            "https://www.youtube.com/watch?v=abc123",
            "http://youtube.com/watch?v=abc123",
            "youtube.com/watch?v=abc123",
            "https://youtu.be/abc123",
            "https://m.youtube.com/watch?v=abc123",
            "https://music.youtube.com/watch?v=abc123",
        ] {
            assert!(is_supported_source(url), "{url} should be accepted");
        }
    }

    #[test]
    fn test_rejects_other_domains_and_bare_hosts() {
        for url in [
            "https://vimeo.com/123",
            "https://www.youtube.com/",
            "https://youtube.com.evil.example/watch?v=1",
            "ftp://youtube.com/watch?v=1",
            "not a url",
        ] {
            assert!(!is_supported_source(url), "{url} should be rejected");
        }
    }

    #[test]
    fn test_validate_missing_and_invalid() {
        assert_eq!(
            validate_source_url(None),
            Err(StoreError::validation("YouTube URL is required"))
        );
        assert_eq!(
            validate_source_url(Some("   ")),
            Err(StoreError::validation("YouTube URL is required"))
        );
        assert_eq!(
            validate_source_url(Some("https://example.com/video")),
            Err(StoreError::validation("Invalid YouTube URL"))
        );
    }

    #[test]
    fn test_validate_trims_whitespace() {
        assert_eq!(
            validate_source_url(Some("  https://youtu.be/abc  ")).unwrap(),
            "https://youtu.be/abc"
        );
    }
}
