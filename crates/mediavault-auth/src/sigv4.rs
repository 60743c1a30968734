//! AWS Signature Version 4 header signing.
//!
//! [`Signer::sign_headers`] adds `host`, `x-amz-date`, `x-amz-content-sha256`,
//! and `authorization` to a caller-supplied header set:
//!
//! 1. Merge the caller headers with the three derived headers.
//! 2. Build the canonical request over every header in the merged set.
//! 3. Build the string to sign from the timestamp, credential scope, and canonical request hash.
//! 4. Derive (or reuse) the signing key for the request date.
//! 5. Emit the `Authorization` header carrying the hex signature.

use std::fmt;

use chrono::{DateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use http::header::{AUTHORIZATION, HOST};
use http::{HeaderMap, HeaderValue, Method, Uri};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::canonical::{
    CanonicalRequest, build_canonical_headers, build_canonical_query_string, build_canonical_uri,
};
use crate::credentials::Credentials;
use crate::error::SignError;

/// The only algorithm this signer emits.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Default service name in the credential scope.
pub const DEFAULT_SERVICE: &str = "s3";

/// Header carrying the request timestamp.
pub const X_AMZ_DATE: &str = "x-amz-date";

/// Header carrying the payload digest.
pub const X_AMZ_CONTENT_SHA256: &str = "x-amz-content-sha256";

type HmacSha256 = Hmac<Sha256>;

/// Signs requests for one set of credentials, region, and service.
///
/// Signing is pure apart from the clock read in [`Signer::sign_headers`]; the
/// `_at` variants take the timestamp explicitly and are fully deterministic.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use http::{HeaderMap, Method};
/// use mediavault_auth::{Credentials, Signer};
///
/// let creds = Credentials::new("AKID", "secret").unwrap();
/// let signer = Signer::new(creds, "auto");
/// let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
///
/// let headers = signer
///     .sign_headers_at(&Method::GET, "https://acct.r2.cloudflarestorage.com/bucket", &HeaderMap::new(), b"", now)
///     .unwrap();
///
/// assert_eq!(headers["x-amz-date"], "20240301T120000Z");
/// assert!(headers["authorization"]
///     .to_str()
///     .unwrap()
///     .starts_with("AWS4-HMAC-SHA256 Credential=AKID/20240301/auto/s3/aws4_request"));
/// ```
pub struct Signer {
    credentials: Credentials,
    region: String,
    service: String,
    key_cache: SigningKeyCache,
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("credentials", &self.credentials)
            .field("region", &self.region)
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

impl Signer {
    /// Create a signer for the `s3` service in `region`.
    #[must_use]
    pub fn new(credentials: Credentials, region: impl Into<String>) -> Self {
        Self {
            credentials,
            region: region.into(),
            service: DEFAULT_SERVICE.to_owned(),
            key_cache: SigningKeyCache::default(),
        }
    }

    /// The credentials this signer uses.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Sign a request at the current time.
    ///
    /// # Errors
    ///
    /// See [`Signer::sign_headers_at`].
    pub fn sign_headers(
        &self,
        method: &Method,
        url: &str,
        headers: &HeaderMap,
        payload: &[u8],
    ) -> Result<HeaderMap, SignError> {
        self.sign_headers_at(method, url, headers, payload, Utc::now())
    }

    /// Sign a request at a fixed time, returning the caller headers plus
    /// `host`, `x-amz-date`, `x-amz-content-sha256`, and `authorization`.
    ///
    /// Every header in the returned set except `authorization` is signed.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::InvalidUrl`] when `url` is not absolute or its path
    /// does not decode to UTF-8, or [`SignError::InvalidHeaderValue`] when a
    /// caller header is not visible ASCII.
    pub fn sign_headers_at(
        &self,
        method: &Method,
        url: &str,
        headers: &HeaderMap,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> Result<HeaderMap, SignError> {
        let target = Target::parse(url)?;
        let amz_date = format_amz_date(now);
        let date = &amz_date[..8];
        let payload_hash = hash_payload(payload);

        let mut signed = headers.clone();
        signed.remove(AUTHORIZATION);
        signed.insert(HOST, header_value(HOST.as_str(), &target.host)?);
        signed.insert(X_AMZ_DATE, header_value(X_AMZ_DATE, &amz_date)?);
        signed.insert(
            X_AMZ_CONTENT_SHA256,
            header_value(X_AMZ_CONTENT_SHA256, &payload_hash)?,
        );

        let canonical_headers = build_canonical_headers(&signed)?;
        let canonical_request = CanonicalRequest {
            method: method.as_str().to_owned(),
            uri: build_canonical_uri(&target.path)?,
            query: build_canonical_query_string(&target.query),
            headers: canonical_headers.canonical,
            signed_headers: canonical_headers.signed,
            payload_hash,
        };
        debug!(%canonical_request, "built canonical request");

        let scope = self.credential_scope(date);
        let signature = self.signature(date, &scope, &amz_date, &canonical_request);

        let authorization = format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={}, Signature={signature}",
            self.credentials.access_key_id(),
            canonical_request.signed_headers,
        );
        signed.insert(AUTHORIZATION, header_value(AUTHORIZATION.as_str(), &authorization)?);

        debug!(
            %method,
            host = %target.host,
            path = %target.path,
            signed_headers = %canonical_request.signed_headers,
            "signed request headers"
        );

        Ok(signed)
    }

    /// `date/region/service/aws4_request`.
    pub(crate) fn credential_scope(&self, date: &str) -> String {
        format!("{date}/{}/{}/aws4_request", self.region, self.service)
    }

    /// Sign a canonical request, reusing the cached key for `date` if present.
    pub(crate) fn signature(
        &self,
        date: &str,
        scope: &str,
        amz_date: &str,
        canonical_request: &CanonicalRequest,
    ) -> String {
        let string_to_sign = build_string_to_sign(amz_date, scope, &canonical_request.hash());
        debug!(string_to_sign, "built string to sign");

        let signing_key = self.key_cache.get_or_derive(date, || {
            derive_signing_key(
                self.credentials.secret_access_key(),
                date,
                &self.region,
                &self.service,
            )
        });
        compute_signature(&signing_key, &string_to_sign)
    }
}

/// Scheme, authority, path, and raw query of a URL being signed.
#[derive(Debug)]
pub(crate) struct Target {
    pub scheme: String,
    pub host: String,
    pub path: String,
    pub query: String,
}

impl Target {
    pub(crate) fn parse(url: &str) -> Result<Self, SignError> {
        let uri: Uri = url
            .parse()
            .map_err(|e| SignError::InvalidUrl(format!("{url}: {e}")))?;
        let scheme = uri
            .scheme_str()
            .ok_or_else(|| SignError::InvalidUrl(format!("{url}: missing scheme")))?;
        let authority = uri
            .authority()
            .ok_or_else(|| SignError::InvalidUrl(format!("{url}: missing host")))?;

        let default_port = match scheme {
            "https" => Some(443),
            "http" => Some(80),
            _ => None,
        };
        let host = match authority.port_u16() {
            Some(port) if Some(port) != default_port => format!("{}:{port}", authority.host()),
            _ => authority.host().to_owned(),
        };

        Ok(Self {
            scheme: scheme.to_owned(),
            host,
            path: uri.path().to_owned(),
            query: uri.query().unwrap_or_default().to_owned(),
        })
    }
}

/// Holds the signing key for the most recent date.
///
/// Region, service, and secret are fixed per [`Signer`], so the date alone
/// identifies the key.
#[derive(Default)]
struct SigningKeyCache {
    slot: Mutex<Option<(String, Vec<u8>)>>,
}

impl SigningKeyCache {
    fn get_or_derive(&self, date: &str, derive: impl FnOnce() -> Vec<u8>) -> Vec<u8> {
        let mut slot = self.slot.lock();
        if let Some((_, key)) = slot.as_ref().filter(|(cached, _)| cached.as_str() == date) {
            return key.clone();
        }
        let key = derive();
        *slot = Some((date.to_owned(), key.clone()));
        key
    }
}

/// Format a timestamp as `YYYYMMDDTHHMMSSZ`.
#[must_use]
pub fn format_amz_date(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Build the string to sign.
///
/// # Examples
///
/// ```
/// use mediavault_auth::sigv4::build_string_to_sign;
///
/// let sts = build_string_to_sign(
///     "20130524T000000Z",
///     "20130524/us-east-1/s3/aws4_request",
///     "7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972",
/// );
/// assert!(sts.starts_with("AWS4-HMAC-SHA256\n20130524T000000Z\n"));
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Derive the SigV4 signing key using the HMAC-SHA256 chain.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes());
    hmac_sha256(&date_region_service_key, b"aws4_request")
}

/// Hex HMAC-SHA256 of `data` under `signing_key`.
#[must_use]
pub fn compute_signature(signing_key: &[u8], data: &str) -> String {
    hex::encode(hmac_sha256(signing_key, data.as_bytes()))
}

/// Lowercase hex SHA-256 of a payload.
///
/// # Examples
///
/// ```
/// use mediavault_auth::sigv4::hash_payload;
///
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, SignError> {
    HeaderValue::from_str(value).map_err(|_| SignError::InvalidHeaderValue(name.to_owned()))
}
