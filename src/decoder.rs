//! Recovery of manifest URLs from packed player scripts.
//!
//! The origin sites embed the real manifest location inside a
//! `eval(function(p,a,c,k,e,d){...}(...))` wrapper: the first wrapper
//! argument is a semicolon-delimited list of `name=value` assignments (the
//! cipher body), the fourth a pipe-delimited dictionary string. Each value
//! decodes to a URL by treating every character as a hex index into the
//! dictionary, with `.` `-` `/` `:` passing through literally.
//!
//! Absence of the wrapper is a normal outcome for some pages, so
//! [`decode`] returns an empty list rather than an error.

use regex::Regex;
use std::sync::LazyLock;

/// Characters copied through the substitution untouched.
const LITERAL_CHARS: [char; 4] = ['.', '-', '/', ':'];

/// Matches the packed-eval wrapper and captures the cipher body (group 1)
/// and the pipe-delimited dictionary string (group 4). Both quote styles
/// appear in the wild.
static PACKED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)eval\(function\(p,a,c,k,e,d\)\{.+?\}\(['"](.+?)['"],([0-9]+),([0-9]+),['"](.+?)['"]\.split\('\|'\)"#,
    )
    .expect("packed-eval pattern is valid")
});

/// A cipher body plus its substitution dictionary, as extracted from one
/// script. At most one payload is expected per page.
#[derive(Debug, Clone, PartialEq)]
pub struct ObfuscatedPayload {
    pub cipher_body: String,
    pub dictionary: Vec<String>,
}

/// Scan script text for the packed-eval signature.
///
/// Returns `None` when the signature is absent; callers treat that as
/// "this page is not obfuscated", not as a failure.
pub fn extract_payload(script_text: &str) -> Option<ObfuscatedPayload> {
    let caps = PACKED_RE.captures(script_text)?;

    let cipher_body = caps.get(1)?.as_str().to_string();
    let dictionary: Vec<String> = caps
        .get(4)?
        .as_str()
        .split('|')
        .map(str::to_string)
        .collect();

    Some(ObfuscatedPayload {
        cipher_body,
        dictionary,
    })
}

/// Substitute one cleaned cipher value through the dictionary.
///
/// Hex digits index the dictionary; `.` `-` `/` `:` copy through literally;
/// an index past the end of the dictionary drops that character; any other
/// character is kept as-is.
fn transliterate(value: &str, dictionary: &[String]) -> String {
    let mut decoded = String::new();

    for c in value.chars() {
        if LITERAL_CHARS.contains(&c) {
            decoded.push(c);
        } else if let Some(index) = c.to_digit(16) {
            if let Some(word) = dictionary.get(index as usize) {
                decoded.push_str(word);
            }
            // Out-of-range index: skip the character, keep decoding
        } else {
            decoded.push(c);
        }
    }

    decoded
}

/// Decode every assignment in the payload's cipher body.
///
/// Only decoded strings that look like manifest URLs (containing `.m3u8`
/// or a `/master` path segment) are returned.
pub fn deobfuscate(payload: &ObfuscatedPayload) -> Vec<String> {
    if payload.cipher_body.is_empty() || payload.dictionary.is_empty() {
        return Vec::new();
    }

    let mut results = Vec::new();

    for part in payload.cipher_body.split(';') {
        let Some((_, raw_value)) = part.split_once('=') else {
            continue;
        };

        // Strip quoting and escaping noise around the value
        let value: String = raw_value
            .chars()
            .filter(|c| !matches!(c, '"' | '\'' | '\\' | ' '))
            .collect();

        let decoded = transliterate(&value, &payload.dictionary);

        if !decoded.is_empty() && is_manifest_candidate(&decoded) {
            tracing::info!("Decoded manifest candidate: {}", truncate(&decoded, 50));
            results.push(decoded);
        }
    }

    results
}

/// Decode obfuscated script text into manifest URL candidates.
///
/// Combines [`extract_payload`] and [`deobfuscate`]; an absent or empty
/// payload yields an empty list.
pub fn decode(script_text: &str) -> Vec<String> {
    match extract_payload(script_text) {
        Some(payload) => deobfuscate(&payload),
        None => Vec::new(),
    }
}

fn is_manifest_candidate(decoded: &str) -> bool {
    decoded.contains(".m3u8") || decoded.contains("/master")
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
