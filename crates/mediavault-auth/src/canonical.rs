//! Canonical request construction for AWS Signature Version 4.
//!
//! The canonical request is the newline-separated string
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! whose SHA-256 digest is folded into the string to sign. Every component is
//! normalized here so that the signer and the storage service compute the
//! same bytes.

use std::collections::BTreeMap;
use std::fmt;

use http::HeaderMap;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use sha2::{Digest, Sha256};

use crate::error::SignError;

/// Characters that must be percent-encoded in paths and query components.
///
/// Everything except the RFC 3986 unreserved set (`A-Z a-z 0-9 - _ . ~`).
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// A fully normalized request, ready to be hashed into the string to sign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    /// Upper-case HTTP method.
    pub method: String,
    /// Percent-encoded path.
    pub uri: String,
    /// Sorted query string.
    pub query: String,
    /// `name:value` lines, sorted by name, without trailing newline.
    pub headers: String,
    /// Semicolon-separated signed header names.
    pub signed_headers: String,
    /// Hex SHA-256 of the payload, or `UNSIGNED-PAYLOAD`.
    pub payload_hash: String,
}

impl CanonicalRequest {
    /// Lowercase hex SHA-256 of the canonical request string.
    #[must_use]
    pub fn hash(&self) -> String {
        hex::encode(Sha256::digest(self.to_string().as_bytes()))
    }
}

impl fmt::Display for CanonicalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{}\n{}\n{}\n\n{}\n{}",
            self.method, self.uri, self.query, self.headers, self.signed_headers, self.payload_hash
        )
    }
}

/// Canonical header block and the matching signed-headers list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalHeaders {
    /// `name:value` lines joined by `\n`.
    pub canonical: String,
    /// Header names joined by `;`.
    pub signed: String,
}

/// Percent-encode a single path segment or query component.
///
/// # Examples
///
/// ```
/// use mediavault_auth::canonical::uri_encode;
///
/// assert_eq!(uri_encode("a b/c"), "a%20b%2Fc");
/// assert_eq!(uri_encode("file-1_v2.~mp4"), "file-1_v2.~mp4");
/// ```
#[must_use]
pub fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, URI_ENCODE_SET).to_string()
}

/// Percent-encode an object key segment by segment, keeping `/` as a separator.
///
/// # Examples
///
/// ```
/// use mediavault_auth::canonical::encode_key;
///
/// assert_eq!(encode_key("youth/2023/summer camp.mp4"), "youth/2023/summer%20camp.mp4");
/// assert_eq!(encode_key("a&b/c?d"), "a%26b/c%3Fd");
/// ```
#[must_use]
pub fn encode_key(key: &str) -> String {
    key.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
}

/// Build the canonical URI from a request path.
///
/// Each segment is decoded first and then re-encoded, so an already encoded
/// path is not encoded twice. Empty paths normalize to `/`.
///
/// # Errors
///
/// Returns [`SignError::InvalidUrl`] when a segment does not decode to UTF-8.
///
/// # Examples
///
/// ```
/// use mediavault_auth::canonical::build_canonical_uri;
///
/// assert_eq!(build_canonical_uri("").unwrap(), "/");
/// assert_eq!(build_canonical_uri("/bucket/a%20b.mp4").unwrap(), "/bucket/a%20b.mp4");
/// assert!(build_canonical_uri("/bucket/%FF.mp4").is_err());
/// ```
pub fn build_canonical_uri(path: &str) -> Result<String, SignError> {
    if path.is_empty() || path == "/" {
        return Ok("/".to_owned());
    }

    let segments = path
        .split('/')
        .map(|segment| {
            percent_decode_str(segment)
                .decode_utf8()
                .map(|decoded| uri_encode(&decoded))
                .map_err(|e| SignError::InvalidUrl(format!("path segment {segment:?}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(segments.join("/"))
}

/// Sort an already encoded query string by key, then by value.
///
/// Values are kept byte for byte; only the order changes.
///
/// # Examples
///
/// ```
/// use mediavault_auth::canonical::build_canonical_query_string;
///
/// assert_eq!(
///     build_canonical_query_string("prefix=youth%2F&list-type=2&delimiter=%2F"),
///     "delimiter=%2F&list-type=2&prefix=youth%2F"
/// );
/// ```
#[must_use]
pub fn build_canonical_query_string(query: &str) -> String {
    let mut params: Vec<(&str, &str)> = query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|param| param.split_once('=').unwrap_or((param, "")))
        .collect();

    params.sort_unstable();

    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Encode raw `(key, value)` pairs and emit them as a canonical query string.
///
/// # Examples
///
/// ```
/// use mediavault_auth::canonical::encode_query_pairs;
///
/// assert_eq!(
///     encode_query_pairs(&[("prefix", "청년회/"), ("delimiter", "/")]),
///     "delimiter=%2F&prefix=%EC%B2%AD%EB%85%84%ED%9A%8C%2F"
/// );
/// ```
#[must_use]
pub fn encode_query_pairs(pairs: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| (uri_encode(k), uri_encode(v)))
        .collect();

    encoded.sort_unstable();

    encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical header block from every header in `headers`.
///
/// Names are already lower-case in [`HeaderMap`]. Values are trimmed with inner
/// whitespace runs collapsed to one space; repeated headers are comma-joined.
pub fn build_canonical_headers(headers: &HeaderMap) -> Result<CanonicalHeaders, SignError> {
    let mut sorted: BTreeMap<&str, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = value
            .to_str()
            .map_err(|_| SignError::InvalidHeaderValue(name.as_str().to_owned()))?;
        let value = collapse_whitespace(value.trim());
        sorted
            .entry(name.as_str())
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    let canonical = sorted
        .iter()
        .map(|(name, value)| format!("{name}:{value}"))
        .collect::<Vec<_>>()
        .join("\n");
    let signed = build_signed_headers_string(sorted.keys().copied());

    Ok(CanonicalHeaders { canonical, signed })
}

/// Join header names, lower-cased and sorted, with `;`.
///
/// # Examples
///
/// ```
/// use mediavault_auth::canonical::build_signed_headers_string;
///
/// assert_eq!(
///     build_signed_headers_string(["X-Amz-Date", "host"]),
///     "host;x-amz-date"
/// );
/// ```
#[must_use]
pub fn build_signed_headers_string<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    let mut names: Vec<String> = names.into_iter().map(str::to_lowercase).collect();
    names.sort_unstable();
    names.dedup();
    names.join(";")
}

fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(ch);
            prev_was_space = false;
        }
    }
    result
}
