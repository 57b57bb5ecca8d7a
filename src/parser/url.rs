//! URL extraction and video-URL helpers.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};
use url::Url;

use super::error::{MAX_URL_LENGTH, ParseError};

/// Regex pattern for finding URLs in text.
/// Matches http:// and https:// URLs, capturing until whitespace or common delimiters.
#[allow(clippy::expect_used)]
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s<>"'\]]+"#).expect("URL regex is valid") // Static pattern, safe to panic
});

const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Extracts and validates URLs from free-form text input.
///
/// Each candidate is validated on its own, so some may succeed while others
/// fail. Successful entries are normalized by the `url` crate.
///
/// # Examples
///
/// ```
/// use dlqueue_core::parser::extract_urls;
///
/// let results = extract_urls("grab https://youtu.be/abc123 please");
/// assert_eq!(results.len(), 1);
/// assert!(results[0].is_ok());
/// ```
#[tracing::instrument(skip(input), fields(input_len = input.len()))]
#[must_use]
pub fn extract_urls(input: &str) -> Vec<Result<String, ParseError>> {
    let mut results = Vec::new();

    for url_match in URL_PATTERN.find_iter(input) {
        let cleaned = clean_url_trailing(url_match.as_str());
        trace!(url = %cleaned, "found URL candidate");

        match validate_url(cleaned) {
            Ok(validated) => {
                debug!(url = %validated, "URL validated");
                results.push(Ok(validated));
            }
            Err(e) => {
                debug!(url = %cleaned, error = %e, "URL validation failed");
                results.push(Err(e));
            }
        }
    }

    results
}

/// Cleans trailing sentence punctuation that often gets captured with URLs.
fn clean_url_trailing(url: &str) -> &str {
    let mut result = url;

    while let Some(last) = result.chars().last() {
        match last {
            '.' | ',' | ';' | ':' | '!' | '?' => {
                result = &result[..result.len() - 1];
            }
            ')' | ']' => {
                let open = if last == ')' { '(' } else { '[' };
                let open_count = result.chars().filter(|&c| c == open).count();
                let close_count = result.chars().filter(|&c| c == last).count();
                if close_count > open_count {
                    result = &result[..result.len() - 1];
                } else {
                    break;
                }
            }
            _ => break,
        }
    }

    result
}

/// Checks one candidate link and returns it normalized by the `url` crate.
fn validate_url(raw: &str) -> Result<String, ParseError> {
    if raw.len() > MAX_URL_LENGTH {
        return Err(ParseError::TooLong { length: raw.len() });
    }

    let parsed = Url::parse(raw).map_err(|e| ParseError::Malformed {
        input: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ParseError::UnsupportedScheme {
            input: raw.to_string(),
            scheme: parsed.scheme().to_string(),
        });
    }
    if parsed.host().is_none() {
        return Err(ParseError::MissingHost {
            input: raw.to_string(),
        });
    }

    Ok(parsed.into())
}

/// Returns true when the URL targets a playlist rather than a single video.
///
/// Playlist URLs are passed to the downloader without `--no-playlist`.
#[must_use]
pub fn is_playlist_url(url: &str) -> bool {
    url.contains("/playlist?list=") || url.contains("&list=")
}

/// Extracts the video id from `watch?v=`, `youtu.be/` and `embed/` URLs.
///
/// Returns `None` for anything else, including non-YouTube hosts.
#[must_use]
pub fn extract_video_id(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw.trim()).ok()?;
    let host = parsed.host_str()?.trim_start_matches("www.").trim_start_matches("m.");

    let id = match host {
        "youtube.com" | "music.youtube.com" => {
            let path = parsed.path();
            if path == "/watch" {
                parsed
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.into_owned())
            } else {
                path.strip_prefix("/embed/")
                    .or_else(|| path.strip_prefix("/shorts/"))
                    .map(|rest| rest.split('/').next().unwrap_or_default().to_string())
            }
        }
        "youtu.be" => parsed
            .path_segments()
            .and_then(|mut segments| segments.next())
            .map(ToString::to_string),
        _ => None,
    }?;

    if id.is_empty() { None } else { Some(id) }
}

/// Builds the canonical watch URL for a video id.
#[must_use]
pub fn build_video_url(video_id: &str) -> String {
    format!("{WATCH_URL_PREFIX}{video_id}")
}

/// Rewrites a single-video link to its watch URL, dropping tracking and
/// timestamp parameters.
///
/// Playlist links and links without a recognizable video id come back
/// unchanged. Two spellings of the same video thus share one recovery key.
#[must_use]
pub fn canonical_video_url(url: &str) -> String {
    if is_playlist_url(url) {
        return url.to_string();
    }
    extract_video_id(url).map_or_else(|| url.to_string(), |id| build_video_url(&id))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_urls_from_mixed_text() {
        let results = extract_urls(
            "first https://www.youtube.com/watch?v=abc, then https://youtu.be/xyz.",
        );
        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].as_ref().unwrap(),
            "https://www.youtube.com/watch?v=abc"
        );
        assert_eq!(results[1].as_ref().unwrap(), "https://youtu.be/xyz");
    }

    #[test]
    fn test_extract_urls_reports_overlong_url() {
        let long = format!("https://example.com/{}", "a".repeat(MAX_URL_LENGTH));
        let results = extract_urls(&long);
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(ParseError::TooLong { .. })));
    }

    #[test]
    fn test_validate_url_rejects_ftp() {
        let err = validate_url("ftp://files.example.com/clip.mp4").unwrap_err();
        assert!(err.to_string().contains("(ftp:)"));
    }

    #[test]
    fn test_is_playlist_url() {
        assert!(is_playlist_url(
            "https://www.youtube.com/playlist?list=PL123"
        ));
        assert!(is_playlist_url(
            "https://www.youtube.com/watch?v=abc&list=PL123"
        ));
        assert!(!is_playlist_url("https://www.youtube.com/watch?v=abc"));
    }

    #[test]
    fn test_extract_video_id_variants() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=60"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ#t=60"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ?si=abc123"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ?rel=0"),
            Some("dQw4w9WgXcQ".to_string())
        );
    }

    #[test]
    fn test_extract_video_id_rejects_other_hosts() {
        assert_eq!(extract_video_id("https://example.com/watch?v=abc123"), None);
        assert_eq!(extract_video_id("https://www.youtube.com/watch"), None);
        assert_eq!(extract_video_id(""), None);
    }

    #[test]
    fn test_validate_url_rejects_hostless_file_link() {
        let err = validate_url("file:///home/me/clip.mp4").unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedScheme { ref scheme, .. } if scheme == "file"));
    }

    #[test]
    fn test_canonical_video_url() {
        assert_eq!(
            canonical_video_url("https://youtu.be/dQw4w9WgXcQ?si=tracking"),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
        assert_eq!(
            canonical_video_url("https://www.youtube.com/shorts/dQw4w9WgXcQ"),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
        let playlist = "https://www.youtube.com/watch?v=abc&list=PL123";
        assert_eq!(canonical_video_url(playlist), playlist);
        assert_eq!(
            canonical_video_url("https://vimeo.com/12345"),
            "https://vimeo.com/12345"
        );
    }

    #[test]
    fn test_build_video_url() {
        assert_eq!(
            build_video_url("dQw4w9WgXcQ"),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }
}
