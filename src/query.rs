use percent_encoding::percent_decode_str;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static MEANING_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(.*)\s+meaning$").unwrap());

/// Reads the `q` parameter of a search URL.
///
/// The form-decoded value has literal `+` replaced by spaces and is then
/// percent-decoded once more, the way search pages double-encode queries.
/// Anything that cannot be parsed or decoded yields an empty string.
pub fn extract_query(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => query_param(&parsed),
        Err(_) => String::new(),
    }
}

pub(crate) fn query_param(url: &Url) -> String {
    let raw = url
        .query_pairs()
        .find(|(key, _)| key == "q")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default();

    decode_component(&raw.replace('+', " ")).unwrap_or_default()
}

/// Strict percent-decoding: a `%` must be followed by two hex digits and the
/// decoded bytes must be UTF-8.
fn decode_component(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    for (i, byte) in bytes.iter().enumerate() {
        if *byte == b'%' {
            let escape = bytes.get(i + 1..i + 3)?;
            if !escape.iter().all(u8::is_ascii_hexdigit) {
                return None;
            }
        }
    }

    percent_decode_str(input)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

/// Returns the lowercased phrase of a `<phrase> meaning` query.
pub fn match_meaning_phrase(query: &str) -> Option<String> {
    let captures = MEANING_SUFFIX.captures(query.trim())?;
    let phrase = captures.get(1)?.as_str().trim();

    if phrase.is_empty() {
        None
    } else {
        Some(phrase.to_lowercase())
    }
}
