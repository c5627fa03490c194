//! Allow-list of recognized source sites.
//!
//! Validation happens before any scratch directory is created or any engine
//! subprocess is spawned, so unrecognized input has zero side effects.

use url::Url;

/// Domains the pipeline accepts, matched exactly or as a suffix of the host.
const SOURCE_DOMAINS: &[&str] = &["youtube.com", "youtu.be", "music.youtube.com"];

/// The configured allow-list, for display purposes
pub fn recognized_domains() -> &'static [&'static str] {
    SOURCE_DOMAINS
}

/// Check whether a URL points at a recognized source site
pub fn is_recognized(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }

    match parsed.host_str() {
        Some(host) => {
            let host = host.to_lowercase();
            SOURCE_DOMAINS
                .iter()
                .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_youtube_watch_urls() {
        assert!(is_recognized("https://www.youtube.com/watch?v=abc123"));
        assert!(is_recognized("https://youtube.com/shorts/abc123"));
        assert!(is_recognized("https://m.youtube.com/watch?v=abc123"));
        assert!(is_recognized("https://music.youtube.com/watch?v=abc123"));
    }

    #[test]
    fn accepts_short_links() {
        assert!(is_recognized("https://youtu.be/VALID123"));
        assert!(is_recognized("http://youtu.be/VALID123"));
    }

    #[test]
    fn rejects_non_urls() {
        assert!(!is_recognized("not a url"));
        assert!(!is_recognized(""));
        assert!(!is_recognized("youtube.com/watch?v=abc")); // no scheme
    }

    #[test]
    fn rejects_other_sites() {
        assert!(!is_recognized("https://vimeo.com/123456"));
        assert!(!is_recognized("https://example.com/youtube.com"));
        // Domain must match as a host suffix, not a substring
        assert!(!is_recognized("https://notyoutube.com/watch?v=abc"));
        assert!(!is_recognized("https://youtube.com.evil.example/watch"));
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(!is_recognized("ftp://youtube.com/watch?v=abc"));
        assert!(!is_recognized("file:///etc/passwd"));
    }
}
