//! Shared-access signatures for blob URIs.
//!
//! A signed URI has the form
//! `blob://{account}/{container}/{name}?sv=..&sr=b&sp=..[&st=..]&se=..&sig=..`.
//! The signature is an HMAC-SHA256, keyed with the account key, over
//!
//! ```text
//! {sp}\n{st}\n{se}\n/blob/{account}/{container}/{name}\n{sv}\n{sr}
//! ```
//!
//! so a grant cannot be replayed against another blob, widened, or
//! extended without the key.

use crate::{
    models::grant::{BlobOperation, SasPermissions, SignedAccessGrant},
    services::blob_service::{StoreError, StoreResult},
};
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

pub const URI_SCHEME: &str = "blob";
pub const SIGNED_VERSION: &str = "2024-01-01";
const SIGNED_RESOURCE_BLOB: &str = "b";

/// The account/container/blob a URI points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobLocator {
    pub account: String,
    pub container: String,
    pub blob: String,
}

/// The signature fields of a signed URI's query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SasToken {
    pub version: String,
    pub resource: String,
    pub permissions: SasPermissions,
    pub start: Option<DateTime<Utc>>,
    pub expiry: DateTime<Utc>,
    pub signature: String,
}

/// Build the unsigned URI for a blob.
///
/// Rejects `.` and `..` segments, which URL normalisation would drop.
pub fn blob_uri(account: &str, container: &str, blob: &str) -> StoreResult<Url> {
    if blob.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(StoreError::MalformedUri(format!(
            "blob name `{blob}` has a dot path segment"
        )));
    }
    let mut url = Url::parse(&format!("{URI_SCHEME}://{account}"))
        .map_err(|err| StoreError::MalformedUri(err.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| StoreError::MalformedUri(format!("cannot build path for `{account}`")))?
        .push(container)
        .extend(blob.split('/'));
    Ok(url)
}

/// Sign a URI granting `permissions` on `container/blob`.
///
/// Timestamps are signed at second precision, so the returned
/// `expires_on` is `expiry` truncated to the second.
pub fn sign_blob_uri(
    account: &str,
    key: &[u8],
    container: &str,
    blob: &str,
    permissions: SasPermissions,
    start: Option<DateTime<Utc>>,
    expiry: DateTime<Utc>,
) -> StoreResult<SignedAccessGrant> {
    let start = start.map(truncate_to_second);
    let expiry = truncate_to_second(expiry);
    let locator = BlobLocator {
        account: account.to_string(),
        container: container.to_string(),
        blob: blob.to_string(),
    };
    let token = SasToken {
        version: SIGNED_VERSION.to_string(),
        resource: SIGNED_RESOURCE_BLOB.to_string(),
        permissions,
        start,
        expiry,
        signature: String::new(),
    };
    let signature = compute_signature(key, &string_to_sign(&locator, &token))?;

    let mut uri = blob_uri(account, container, blob)?;
    {
        let mut query = uri.query_pairs_mut();
        query.append_pair("sv", &token.version);
        query.append_pair("sr", &token.resource);
        query.append_pair("sp", &permissions.to_string());
        if let Some(start) = start {
            query.append_pair("st", &format_timestamp(start));
        }
        query.append_pair("se", &format_timestamp(expiry));
        query.append_pair("sig", &signature);
    }

    Ok(SignedAccessGrant {
        uri,
        account: locator.account,
        container: locator.container,
        blob: locator.blob,
        permissions,
        expires_on: expiry,
    })
}

/// Split a blob URI into its locator and, if present, its signature fields.
pub fn parse_blob_uri(uri: &Url) -> StoreResult<(BlobLocator, Option<SasToken>)> {
    if uri.scheme() != URI_SCHEME {
        return Err(StoreError::MalformedUri(format!(
            "unsupported scheme `{}`",
            uri.scheme()
        )));
    }
    let account = uri
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| StoreError::MalformedUri("missing account".into()))?
        .to_string();

    let mut segments = uri
        .path_segments()
        .ok_or_else(|| StoreError::MalformedUri("missing path".into()))?
        .map(decode_segment)
        .collect::<StoreResult<Vec<_>>>()?
        .into_iter();
    let container = segments
        .next()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| StoreError::MalformedUri("missing container".into()))?;
    let blob = segments.collect::<Vec<_>>().join("/");
    if blob.is_empty() {
        return Err(StoreError::MalformedUri("missing blob name".into()));
    }

    let locator = BlobLocator {
        account,
        container,
        blob,
    };
    let token = parse_token(uri)?;
    Ok((locator, token))
}

/// Check that `token` authorises `op` on `locator` at `now`.
pub fn verify(
    key: &[u8],
    locator: &BlobLocator,
    token: &SasToken,
    op: BlobOperation,
    now: DateTime<Utc>,
) -> StoreResult<()> {
    if token.resource != SIGNED_RESOURCE_BLOB {
        return Err(StoreError::AuthorizationFailed(format!(
            "signed resource `{}` is not a blob",
            token.resource
        )));
    }

    let provided = general_purpose::STANDARD
        .decode(&token.signature)
        .map_err(|_| StoreError::AuthorizationFailed("signature is not valid base64".into()))?;
    let mut mac = new_mac(key)?;
    mac.update(string_to_sign(locator, token).as_bytes());
    mac.verify_slice(&provided).map_err(|_| {
        StoreError::AuthorizationFailed("signature does not match the signed resource".into())
    })?;

    if let Some(start) = token.start {
        if now < start {
            return Err(StoreError::AuthorizationFailed(
                "signed access grant is not yet valid".into(),
            ));
        }
    }
    if now >= token.expiry {
        return Err(StoreError::AuthorizationFailed(
            "signed access grant has expired".into(),
        ));
    }
    if !token.permissions.allows(op) {
        return Err(StoreError::AuthorizationFailed(format!(
            "{op:?} is not permitted by `{}`",
            token.permissions
        )));
    }
    Ok(())
}

/// The URI with its query string removed, safe to persist or log.
pub fn strip_signature(uri: &Url) -> String {
    let mut bare = uri.clone();
    bare.set_query(None);
    bare.to_string()
}

fn string_to_sign(locator: &BlobLocator, token: &SasToken) -> String {
    format!(
        "{}\n{}\n{}\n/blob/{}/{}/{}\n{}\n{}",
        token.permissions,
        token.start.map(format_timestamp).unwrap_or_default(),
        format_timestamp(token.expiry),
        locator.account,
        locator.container,
        locator.blob,
        token.version,
        token.resource,
    )
}

fn compute_signature(key: &[u8], string_to_sign: &str) -> StoreResult<String> {
    let mut mac = new_mac(key)?;
    mac.update(string_to_sign.as_bytes());
    Ok(general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

fn new_mac(key: &[u8]) -> StoreResult<HmacSha256> {
    HmacSha256::new_from_slice(key)
        .map_err(|_| StoreError::AuthorizationFailed("unusable account key".into()))
}

fn parse_token(uri: &Url) -> StoreResult<Option<SasToken>> {
    let mut version = None;
    let mut resource = None;
    let mut permissions = None;
    let mut start = None;
    let mut expiry = None;
    let mut signature = None;

    for (key, value) in uri.query_pairs() {
        match key.as_ref() {
            "sv" => version = Some(value.into_owned()),
            "sr" => resource = Some(value.into_owned()),
            "sp" => {
                permissions = Some(SasPermissions::parse(&value).ok_or_else(|| {
                    StoreError::MalformedUri(format!("invalid permissions `{value}`"))
                })?)
            }
            "st" => start = Some(parse_timestamp(&value)?),
            "se" => expiry = Some(parse_timestamp(&value)?),
            "sig" => signature = Some(value.into_owned()),
            _ => {}
        }
    }

    let Some(signature) = signature else {
        return Ok(None);
    };
    let missing = |field: &str| StoreError::MalformedUri(format!("signed uri missing `{field}`"));
    Ok(Some(SasToken {
        version: version.ok_or_else(|| missing("sv"))?,
        resource: resource.ok_or_else(|| missing("sr"))?,
        permissions: permissions.ok_or_else(|| missing("sp"))?,
        start,
        expiry: expiry.ok_or_else(|| missing("se"))?,
        signature,
    }))
}

fn decode_segment(segment: &str) -> StoreResult<String> {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .map_err(|err| StoreError::MalformedUri(err.to_string()))
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::MalformedUri(format!("invalid timestamp `{value}`")))
}

fn truncate_to_second(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(ts.timestamp(), 0).unwrap_or(ts)
}
