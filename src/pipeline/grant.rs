//! Minting of per-blob, read-only access grants.

use crate::{
    errors::{MoveError, MoveResult},
    models::{
        grant::{SasPermissions, SignedAccessGrant},
        object::ObjectReference,
    },
    services::blob_service::BlobService,
};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

/// How long a minted grant stays valid.
///
/// Must outlast the slowest expected copy; a copy still running at expiry
/// is failed by the storage service.
pub const GRANT_LIFETIME_MINUTES: i64 = 60;

pub fn grant_lifetime() -> TimeDelta {
    TimeDelta::minutes(GRANT_LIFETIME_MINUTES)
}

/// Mint a fresh grant allowing only reads of `object`, valid from `now`
/// for [`GRANT_LIFETIME_MINUTES`].
///
/// Grants are never cached; every call signs a new one.
pub fn mint_read_grant(
    service: &dyn BlobService,
    object: &ObjectReference,
    now: DateTime<Utc>,
) -> MoveResult<SignedAccessGrant> {
    let expires_on = now + grant_lifetime();
    let grant = service
        .sign_blob_uri(
            &object.container,
            &object.name,
            SasPermissions::read_only(),
            expires_on,
        )
        .map_err(|source| MoveError::GrantMinting {
            name: object.name.clone(),
            source,
        })?;

    if !grant.permissions.is_read_only() {
        return Err(MoveError::GrantScope {
            name: object.name.clone(),
            permissions: grant.permissions.to_string(),
        });
    }

    debug!(name = %object.name, expires_on = %grant.expires_on, "minted read grant");
    Ok(grant)
}
