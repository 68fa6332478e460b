use url::Url;

/// Truncate a string to at most `max` characters
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Origin (scheme + host + port) of a URL, used as the base for relative links
pub fn origin_of(url: &str) -> Option<Url> {
    let parsed = Url::parse(url).ok()?;
    if !parsed.origin().is_tuple() {
        return None;
    }
    Url::parse(&parsed.origin().ascii_serialization()).ok()
}
