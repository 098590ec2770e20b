//! YouTube link helpers used for local pre-checks and player URLs.
use once_cell::sync::Lazy;
use regex::Regex;

static VIDEO_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11})").expect("valid video id regex"));

static CHANNEL_HANDLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"youtube\.com/@([A-Za-z0-9_.-]+)").expect("valid channel handle regex")
});

static CHANNEL_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"youtube\.com/(?:channel|c|user)/([A-Za-z0-9_.-]+)")
        .expect("valid channel path regex")
});

/// Extract the 11-character video id from watch, short, embed and shorts links.
pub fn extract_video_id(url: &str) -> Option<&str> {
    VIDEO_ID_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// `@handle` of a channel link, without the `@`.
pub fn channel_handle(url: &str) -> Option<&str> {
    CHANNEL_HANDLE_RE
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// True for links the import endpoint can resolve to a channel.
pub fn is_channel_url(url: &str) -> bool {
    channel_handle(url).is_some() || CHANNEL_PATH_RE.is_match(url)
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Embed URL with the autoplay flags the shorts player uses.
pub fn embed_url(video_id: &str) -> String {
    format!(
        "https://www.youtube.com/embed/{}?autoplay=1&rel=0&modestbranding=1&playsinline=1",
        video_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_id_from_common_forms() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10"),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(extract_video_id("https://youtu.be/dQw4w9WgXcQ"), Some("dQw4w9WgXcQ"));
        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            extract_video_id("https://www.youtube.com/shorts/abcdefghijk"),
            Some("abcdefghijk")
        );
        assert_eq!(extract_video_id("https://example.com/"), None);
        assert_eq!(extract_video_id("not a link"), None);
    }

    #[test]
    fn channel_links() {
        assert_eq!(
            channel_handle("https://www.youtube.com/@artist_official"),
            Some("artist_official")
        );
        assert!(is_channel_url("https://www.youtube.com/channel/UC1234567890"));
        assert!(is_channel_url("https://youtube.com/@artist"));
        assert!(!is_channel_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
    }

    #[test]
    fn player_urls() {
        assert_eq!(watch_url("abc"), "https://www.youtube.com/watch?v=abc");
        assert!(embed_url("abc").starts_with("https://www.youtube.com/embed/abc?autoplay=1"));
    }
}
