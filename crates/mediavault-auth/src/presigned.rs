//! Presigned URL generation.
//!
//! A presigned URL carries its authentication in the query string, so a
//! browser can fetch the object directly until the URL expires. Only the
//! `host` header is signed and the payload is `UNSIGNED-PAYLOAD`.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use http::Method;
use percent_encoding::percent_decode_str;
use tracing::debug;

use crate::canonical::{CanonicalRequest, build_canonical_uri, uri_encode};
use crate::error::SignError;
use crate::sigv4::{ALGORITHM, Signer, Target, format_amz_date};

/// Payload hash used for presigned requests.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Longest validity SigV4 accepts for a presigned URL (seven days).
pub const MAX_PRESIGN_EXPIRES: u64 = 604_800;

/// A URL that grants temporary access to one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedUrl {
    /// The complete URL, `X-Amz-Signature` last.
    pub url: String,
    /// The instant after which the service rejects the URL.
    pub expires_at: DateTime<Utc>,
}

impl Signer {
    /// Presign `url` valid for `expires` seconds from now.
    ///
    /// # Errors
    ///
    /// See [`Signer::presign_url_at`].
    pub fn presign_url(
        &self,
        method: &Method,
        url: &str,
        extra_query: &[(&str, &str)],
        expires: u64,
    ) -> Result<PresignedUrl, SignError> {
        self.presign_url_at(method, url, extra_query, expires, Utc::now())
    }

    /// Presign `url` at a fixed time.
    ///
    /// `extra_query` holds raw (unencoded) pairs such as
    /// `response-content-disposition`; they are encoded and signed along with
    /// any query already present on `url`.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::InvalidExpiry`] when `expires` is outside
    /// `1..=604800`, or [`SignError::InvalidUrl`] when `url` is not absolute or
    /// its path does not decode to UTF-8.
    pub fn presign_url_at(
        &self,
        method: &Method,
        url: &str,
        extra_query: &[(&str, &str)],
        expires: u64,
        now: DateTime<Utc>,
    ) -> Result<PresignedUrl, SignError> {
        if expires == 0 || expires > MAX_PRESIGN_EXPIRES {
            return Err(SignError::InvalidExpiry(expires));
        }
        let lifetime = i64::try_from(expires)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .ok_or(SignError::InvalidExpiry(expires))?;

        let target = Target::parse(url)?;
        let amz_date = format_amz_date(now);
        let date = &amz_date[..8];
        let scope = self.credential_scope(date);
        let credential = format!("{}/{scope}", self.credentials().access_key_id());
        let expires_str = expires.to_string();

        let mut params: Vec<(String, String)> = target
            .query
            .split('&')
            .filter(|s| !s.is_empty())
            .map(|param| {
                let (k, v) = param.split_once('=').unwrap_or((param, ""));
                (k.to_owned(), v.to_owned())
            })
            .collect();
        let signing_params = [
            ("X-Amz-Algorithm", ALGORITHM),
            ("X-Amz-Credential", credential.as_str()),
            ("X-Amz-Date", amz_date.as_str()),
            ("X-Amz-Expires", expires_str.as_str()),
            ("X-Amz-SignedHeaders", "host"),
        ];
        params.extend(
            extra_query
                .iter()
                .chain(signing_params.iter())
                .map(|(k, v)| (uri_encode(k), uri_encode(v))),
        );
        params.sort_unstable();
        let query = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_request = CanonicalRequest {
            method: method.as_str().to_owned(),
            uri: build_canonical_uri(&target.path)?,
            query,
            headers: format!("host:{}", target.host),
            signed_headers: "host".to_owned(),
            payload_hash: UNSIGNED_PAYLOAD.to_owned(),
        };
        debug!(%canonical_request, "built presign canonical request");

        let signature = self.signature(date, &scope, &amz_date, &canonical_request);
        let url = format!(
            "{}://{}{}?{}&X-Amz-Signature={signature}",
            target.scheme, target.host, canonical_request.uri, canonical_request.query
        );

        debug!(%method, host = %target.host, path = %target.path, expires, "presigned url");

        Ok(PresignedUrl {
            url,
            expires_at: now + lifetime,
        })
    }
}

/// Compute the expiry instant of a presigned URL from its `X-Amz-Date` and
/// `X-Amz-Expires` parameters.
///
/// # Errors
///
/// Returns [`SignError::MissingQueryParam`] when either parameter is absent and
/// [`SignError::InvalidUrl`] when one is malformed.
///
/// # Examples
///
/// ```
/// use mediavault_auth::presigned_expiry;
///
/// let url = "https://h/b/k?X-Amz-Date=20240301T120000Z&X-Amz-Expires=3600&X-Amz-Signature=00";
/// let expiry = presigned_expiry(url).unwrap();
/// assert_eq!(expiry.to_rfc3339(), "2024-03-01T13:00:00+00:00");
/// ```
pub fn presigned_expiry(url: &str) -> Result<DateTime<Utc>, SignError> {
    let query = url.split_once('?').map_or("", |(_, q)| q);
    let param = |name: &'static str| {
        query
            .split('&')
            .filter_map(|p| p.split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| percent_decode_str(v).decode_utf8_lossy().into_owned())
            .ok_or(SignError::MissingQueryParam(name))
    };

    let date = param("X-Amz-Date")?;
    let expires = param("X-Amz-Expires")?;

    let signed_at = NaiveDateTime::parse_from_str(&date, "%Y%m%dT%H%M%SZ")
        .map_err(|e| SignError::InvalidUrl(format!("X-Amz-Date {date}: {e}")))?
        .and_utc();
    let lifetime = expires
        .parse::<i64>()
        .ok()
        .and_then(TimeDelta::try_seconds)
        .ok_or_else(|| SignError::InvalidUrl(format!("X-Amz-Expires {expires}")))?;

    Ok(signed_at + lifetime)
}
