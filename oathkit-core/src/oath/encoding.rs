//! Secret and parameter decoding helpers
//!
//! Shared secrets arrive as Base32 typed or scanned by humans, so decoding is
//! lenient: whitespace and hyphens are removed, padding is restored to an
//! 8-character boundary and the input is case-folded. Secrets that are not
//! Base32 are tried as base64. Extension parameters of
//! the `mfauth` scheme are base64url and are only decoded when they look like it.

use data_encoding::{BASE32, BASE64, BASE64URL, BASE64URL_NOPAD, BASE64_NOPAD};

/// Remove separators people put into secrets
fn clean(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// Pad input string to 8-character boundaries
///
/// Formula: padding_length = (8 - (len % 8)) % 8
fn pad(input: &str) -> String {
    let padding_len = (8 - (input.len() % 8)) % 8;
    format!("{}{}", input, "=".repeat(padding_len))
}

/// Decode a Base32 secret to raw key bytes
///
/// Returns `None` for an empty or undecodable secret.
pub fn decode_base32(input: &str) -> Option<Vec<u8>> {
    let cleaned = clean(input);
    let unpadded = cleaned.trim_end_matches('=');
    if unpadded.is_empty() {
        return None;
    }

    BASE32
        .decode(pad(&unpadded.to_uppercase()).as_bytes())
        .ok()
        .filter(|bytes| !bytes.is_empty())
}

/// Decode a base64 or base64url value, with or without padding
pub fn decode_base64(input: &str) -> Option<Vec<u8>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let bytes = trimmed.as_bytes();

    [&BASE64URL_NOPAD, &BASE64URL, &BASE64_NOPAD, &BASE64]
        .iter()
        .find_map(|encoding| encoding.decode(bytes).ok())
}

/// Decode a shared secret given as Base32, falling back to base64
///
/// Base32 wins when the input is valid in both alphabets.
pub fn decode_secret(input: &str) -> Option<Vec<u8>> {
    decode_base32(input).or_else(|| decode_base64(input).filter(|bytes| !bytes.is_empty()))
}

/// Decode `input` when it is base64 of printable UTF-8, otherwise return it unchanged
///
/// Extension parameters may be sent either encoded or raw; a value is only
/// treated as encoded if every character is in the base64 alphabets and the
/// decoded bytes form printable text.
pub fn decode_if_base64(input: &str) -> String {
    if !looks_like_base64(input) {
        return input.to_string();
    }

    decode_base64(input)
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .filter(|text| !text.is_empty() && !text.chars().any(char::is_control))
        .unwrap_or_else(|| input.to_string())
}

fn looks_like_base64(input: &str) -> bool {
    !input.is_empty()
        && input
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '/' | '='))
}

/// Encode a value for an `mfauth` extension parameter
pub fn encode_base64url(input: &str) -> String {
    BASE64URL_NOPAD.encode(input.as_bytes())
}
