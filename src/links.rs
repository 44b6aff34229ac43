use once_cell::sync::Lazy;
use regex::Regex;

/// Recognized music-service links. Host tokens are matched case-sensitively.
static MUSIC_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r#"(?:https?://)?(?:[a-z0-9]*[\-.])*"#,
        r#"(?:apple|spotify|youtube|youtu|bandcamp|tidal|pandora|napster|yandex|amazon|deezer|jiosaavn|audius|gaana|soundcloud|page)"#,
        r#"\.(?:com|co|link|be)(?:/[^ |\n\t"']*)+"#,
    ))
    .expect("music link pattern is valid")
});

/// Return the first music-service link found in `text`, if any.
///
/// Only the leftmost match is returned; further links in the same message
/// are ignored.
pub fn extract_link(text: &str) -> Option<&str> {
    MUSIC_LINK.find(text).map(|m| m.as_str())
}
