//! `otpauth://` and `mfauth://` URI parsing and formatting
//!
//! Parsing validates the raw string before anything is decoded: oversized
//! URIs, embedded NUL bytes, script schemes, bidi override characters and
//! directory traversal in the label are rejected. Formatting produces the
//! compact canonical form, leaving out parameters equal to their defaults.

use crate::error::OathError;
use crate::oath::encoding::{decode_if_base64, encode_base64url};
use crate::types::{
    OathAlgorithm, OathCredential, OathType, DEFAULT_DIGITS, DEFAULT_PERIOD, MAX_DIGITS,
    MAX_PERIOD, MAX_SECRET_LENGTH, MIN_DIGITS,
};
use std::collections::HashMap;
use tracing::debug;
use url::form_urlencoded;

/// Longest URI accepted by the parser
pub const MAX_URI_LENGTH: usize = 4096;
/// Longest value accepted for any query parameter other than `secret`
pub const MAX_PARAMETER_LENGTH: usize = 256;

const SCHEME_OTPAUTH: &str = "otpauth";
const SCHEME_MFAUTH: &str = "mfauth";

const PARAM_SECRET: &str = "secret";
const PARAM_ISSUER: &str = "issuer";
const PARAM_ALGORITHM: &str = "algorithm";
const PARAM_DIGITS: &str = "digits";
const PARAM_PERIOD: &str = "period";
const PARAM_COUNTER: &str = "counter";
const PARAM_USER_ID: &str = "uid";
const PARAM_RESOURCE_ID: &str = "oid";
const PARAM_IMAGE: &str = "image";
const PARAM_BACKGROUND: &str = "b";
const PARAM_POLICIES: &str = "policies";

const TRAVERSAL_PATTERNS: [&str; 4] = ["../", "..\\", "/..", "\\.."];

/// URI scheme of an OATH registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OathScheme {
    /// Standard Key URI format
    Otpauth,
    /// Extended format with base64url-encoded extension parameters
    Mfauth,
}

impl OathScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            OathScheme::Otpauth => SCHEME_OTPAUTH,
            OathScheme::Mfauth => SCHEME_MFAUTH,
        }
    }
}

fn invalid_uri(reason: impl Into<String>) -> OathError {
    OathError::InvalidUri {
        reason: reason.into(),
    }
}

fn invalid_param(parameter: &str, reason: impl Into<String>) -> OathError {
    OathError::InvalidParameterValue {
        parameter: parameter.to_string(),
        reason: reason.into(),
    }
}

fn contains_bidi_override(value: &str) -> bool {
    value.chars().any(|c| ('\u{202A}'..='\u{202E}').contains(&c))
}

fn contains_script_scheme(value: &str) -> bool {
    value.to_ascii_lowercase().contains("javascript:")
}

fn contains_tag(value: &str) -> bool {
    value
        .find('<')
        .is_some_and(|start| value[start..].contains('>'))
}

fn contains_traversal(value: &str) -> bool {
    TRAVERSAL_PATTERNS.iter().any(|p| value.contains(p))
}

/// Reason a raw string fails the injection checks, if any
fn unsafe_content(value: &str) -> Option<&'static str> {
    if value.contains('\0') {
        Some("contains a NUL character")
    } else if contains_script_scheme(value) {
        Some("contains a script scheme")
    } else if contains_bidi_override(value) {
        Some("contains a bidirectional override character")
    } else {
        None
    }
}

fn validate_parameter(name: &str, value: &str) -> Result<(), OathError> {
    let limit = match name {
        PARAM_SECRET => MAX_SECRET_LENGTH,
        _ => MAX_PARAMETER_LENGTH,
    };
    if value.chars().count() > limit {
        return Err(invalid_param(
            name,
            format!("value exceeds {} characters", limit),
        ));
    }
    if let Some(reason) = unsafe_content(value) {
        return Err(invalid_param(name, reason));
    }
    if contains_tag(value) {
        return Err(invalid_param(name, "contains markup"));
    }
    Ok(())
}

fn percent_decode(input: &str) -> Result<String, OathError> {
    fn from_hex(byte: u8) -> Option<u8> {
        match byte {
            b'0'..=b'9' => Some(byte - b'0'),
            b'a'..=b'f' => Some(byte - b'a' + 10),
            b'A'..=b'F' => Some(byte - b'A' + 10),
            _ => None,
        }
    }

    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let high = bytes.get(i + 1).copied().and_then(from_hex);
            let low = bytes.get(i + 2).copied().and_then(from_hex);
            match (high, low) {
                (Some(high), Some(low)) => {
                    out.push((high << 4) | low);
                    i += 3;
                }
                _ => return Err(invalid_uri("invalid percent encoding in label")),
            }
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out).map_err(|_| invalid_uri("label is not valid UTF-8"))
}

/// Percent-decode one label component and re-run the label checks on it
fn decode_label_part(raw: &str) -> Result<String, OathError> {
    let part = percent_decode(raw)?;
    if contains_traversal(&part) {
        return Err(invalid_uri("label contains a path traversal sequence"));
    }
    if let Some(reason) = unsafe_content(&part) {
        return Err(invalid_uri(reason));
    }
    Ok(part)
}

fn percent_encode_label(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, OathError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| invalid_param(name, format!("'{}' is not a valid number", value)))
}

/// Split `scheme://authority/path?query` without interpreting the path
struct RawUri<'a> {
    scheme: &'a str,
    authority: &'a str,
    path: &'a str,
    query: &'a str,
}

impl<'a> RawUri<'a> {
    fn split(uri: &'a str) -> Result<Self, OathError> {
        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| invalid_uri("missing scheme separator"))?;
        let rest = rest.split_once('#').map_or(rest, |(before, _)| before);
        let (location, query) = rest.split_once('?').unwrap_or((rest, ""));
        let (authority, path) = match location.find('/') {
            Some(idx) => (&location[..idx], &location[idx..]),
            None => (location, ""),
        };
        Ok(Self {
            scheme,
            authority,
            path,
            query,
        })
    }
}

/// Parse an OATH registration URI into a credential
///
/// # Errors
///
/// - `InvalidUri` for a malformed or unsafe scheme, host or label
/// - `MissingRequiredParameter` when `secret` is absent or empty
/// - `InvalidParameterValue` for unsafe or out-of-range parameters
/// - `IssuerMismatch` when the label and `issuer` parameter disagree
pub fn parse_uri(uri: &str) -> Result<OathCredential, OathError> {
    if uri.chars().count() > MAX_URI_LENGTH {
        return Err(invalid_uri(format!(
            "URI exceeds {} characters",
            MAX_URI_LENGTH
        )));
    }
    if uri.contains('\0') || contains_bidi_override(uri) {
        return Err(invalid_uri("URI contains control characters"));
    }

    let raw = RawUri::split(uri.trim())?;
    if let Some(reason) = unsafe_content(raw.scheme)
        .or_else(|| unsafe_content(raw.authority))
        .or_else(|| unsafe_content(raw.path))
    {
        return Err(invalid_uri(reason));
    }

    let scheme = if raw.scheme.eq_ignore_ascii_case(SCHEME_OTPAUTH) {
        OathScheme::Otpauth
    } else if raw.scheme.eq_ignore_ascii_case(SCHEME_MFAUTH) {
        OathScheme::Mfauth
    } else {
        return Err(invalid_uri(format!("unsupported scheme '{}'", raw.scheme)));
    };

    let oath_type: OathType = raw.authority.parse()?;

    if contains_traversal(raw.path) {
        return Err(invalid_uri("label contains a path traversal sequence"));
    }
    let label_raw = raw.path.trim_matches('/');
    if label_raw.is_empty() {
        return Err(invalid_uri("missing label"));
    }
    // Split on the literal separator first so an escaped `%3A` stays part of
    // the issuer or account
    let (label_issuer, account_name) = match label_raw.split_once(':') {
        Some((issuer, account)) => {
            let issuer = decode_label_part(issuer)?;
            let issuer = issuer.trim();
            (
                (!issuer.is_empty()).then(|| issuer.to_string()),
                decode_label_part(account)?.trim().to_string(),
            )
        }
        None => (None, decode_label_part(label_raw)?.trim().to_string()),
    };
    if account_name.is_empty() {
        return Err(invalid_uri("label has no account name"));
    }

    let mut params: HashMap<String, String> = HashMap::new();
    for (key, value) in form_urlencoded::parse(raw.query.as_bytes()) {
        let key = key.to_ascii_lowercase();
        validate_parameter(&key, &key)?;
        validate_parameter(&key, &value)?;
        params.entry(key).or_insert_with(|| value.into_owned());
    }

    let secret = params
        .get(PARAM_SECRET)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| OathError::MissingRequiredParameter {
            parameter: PARAM_SECRET.to_string(),
        })?;

    let query_issuer = params
        .get(PARAM_ISSUER)
        .map(|value| match scheme {
            OathScheme::Mfauth => decode_if_base64(value),
            OathScheme::Otpauth => value.clone(),
        })
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    let issuer = match (label_issuer, query_issuer) {
        (Some(label_issuer), Some(query_issuer)) => {
            if !label_issuer.eq_ignore_ascii_case(&query_issuer) {
                return Err(OathError::IssuerMismatch {
                    label_issuer,
                    query_issuer,
                });
            }
            label_issuer
        }
        (Some(issuer), None) | (None, Some(issuer)) => issuer,
        (None, None) => String::new(),
    };

    let mut credential = OathCredential::new(issuer, account_name, oath_type, secret);

    if let Some(value) = params.get(PARAM_ALGORITHM) {
        credential.oath_algorithm = value.parse::<OathAlgorithm>()?;
    }
    if let Some(value) = params.get(PARAM_DIGITS) {
        let digits: u32 = parse_number(PARAM_DIGITS, value)?;
        if !(MIN_DIGITS..=MAX_DIGITS).contains(&digits) {
            return Err(invalid_param(
                PARAM_DIGITS,
                format!("must be between {} and {}", MIN_DIGITS, MAX_DIGITS),
            ));
        }
        credential.digits = digits;
    }
    if let Some(value) = params.get(PARAM_PERIOD) {
        let period: u32 = parse_number(PARAM_PERIOD, value)?;
        if !(1..=MAX_PERIOD).contains(&period) {
            return Err(invalid_param(
                PARAM_PERIOD,
                format!("must be between 1 and {}", MAX_PERIOD),
            ));
        }
        credential.period = period;
    }
    if let Some(value) = params.get(PARAM_COUNTER) {
        credential.counter = parse_number(PARAM_COUNTER, value)?;
    }

    credential.user_id = params
        .get(PARAM_USER_ID)
        .map(|value| decode_if_base64(value))
        .filter(|value| !value.is_empty());
    credential.resource_id = params
        .get(PARAM_RESOURCE_ID)
        .map(|value| decode_if_base64(value))
        .filter(|value| !value.is_empty());
    credential.policies = params
        .get(PARAM_POLICIES)
        .map(|value| decode_if_base64(value))
        .filter(|value| !value.trim().is_empty());
    credential.image_url = params
        .get(PARAM_IMAGE)
        .filter(|value| !value.is_empty())
        .cloned();

    if let Some(value) = params.get(PARAM_BACKGROUND) {
        let color = value.trim().trim_start_matches('#');
        if !color.is_empty() {
            if !color.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(invalid_param(PARAM_BACKGROUND, "not a hex color"));
            }
            credential.background_color = Some(color.to_string());
        }
    }

    debug!(
        credential_id = %credential.id,
        oath_type = %credential.oath_type,
        scheme = scheme.as_str(),
        "Parsed OATH URI"
    );

    Ok(credential)
}

/// Scheme a credential is formatted with
///
/// Credentials carrying extension data need `mfauth`; everything else uses
/// the standard `otpauth` scheme.
pub fn scheme_for(credential: &OathCredential) -> OathScheme {
    if credential.user_id.is_some()
        || credential.resource_id.is_some()
        || credential.has_policies()
    {
        OathScheme::Mfauth
    } else {
        OathScheme::Otpauth
    }
}

/// Format a credential as its canonical registration URI
///
/// Defaults (SHA1, 6 digits, 30 second period) are omitted; `secret` is
/// always present and so is `counter` for HOTP credentials.
pub fn format_uri(credential: &OathCredential) -> String {
    let scheme = scheme_for(credential);
    let encode_extension = |value: &str| match scheme {
        OathScheme::Mfauth => encode_base64url(value),
        OathScheme::Otpauth => value.to_string(),
    };

    let label = if credential.issuer.is_empty() {
        percent_encode_label(&credential.account_name)
    } else {
        format!(
            "{}:{}",
            percent_encode_label(&credential.issuer),
            percent_encode_label(&credential.account_name)
        )
    };

    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair(PARAM_SECRET, credential.secret().expose());
    if !credential.issuer.is_empty() {
        query.append_pair(PARAM_ISSUER, &encode_extension(&credential.issuer));
    }
    if credential.oath_algorithm != OathAlgorithm::Sha1 {
        query.append_pair(PARAM_ALGORITHM, credential.oath_algorithm.as_uri_value());
    }
    if credential.digits != DEFAULT_DIGITS {
        query.append_pair(PARAM_DIGITS, &credential.digits.to_string());
    }
    match credential.oath_type {
        OathType::Totp => {
            if credential.period != DEFAULT_PERIOD {
                query.append_pair(PARAM_PERIOD, &credential.period.to_string());
            }
        }
        OathType::Hotp => {
            query.append_pair(PARAM_COUNTER, &credential.counter.to_string());
        }
    }
    if let Some(user_id) = &credential.user_id {
        query.append_pair(PARAM_USER_ID, &encode_base64url(user_id));
    }
    if let Some(resource_id) = &credential.resource_id {
        query.append_pair(PARAM_RESOURCE_ID, &encode_base64url(resource_id));
    }
    if let Some(image_url) = &credential.image_url {
        query.append_pair(PARAM_IMAGE, image_url);
    }
    if let Some(color) = &credential.background_color {
        query.append_pair(PARAM_BACKGROUND, color);
    }
    if let Some(policies) = credential.policies.as_deref().filter(|p| !p.trim().is_empty()) {
        query.append_pair(PARAM_POLICIES, &encode_base64url(policies));
    }

    format!(
        "{}://{}/{}?{}",
        scheme.as_str(),
        credential.oath_type.as_str(),
        label,
        query.finish()
    )
}
