//! The contract the migration pipeline requires from a storage service.

use crate::models::{
    copy::CopyState,
    grant::{SasPermissions, SignedAccessGrant},
    object::BlobProperties,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("container `{0}` not found")]
    ContainerNotFound(String),
    #[error("container `{name}` invalid: {reason}")]
    InvalidContainerName { name: String, reason: String },
    #[error("blob `{name}` not found in container `{container}`")]
    BlobNotFound { container: String, name: String },
    #[error("invalid blob name")]
    InvalidBlobName,
    #[error("no copy recorded for blob `{name}` in container `{container}`")]
    NoCopyRecorded { container: String, name: String },
    #[error("storage account `{0}` is not known")]
    UnknownAccount(String),
    #[error("invalid connection string: {0}")]
    InvalidConnectionString(String),
    #[error("malformed blob uri: {0}")]
    MalformedUri(String),
    #[error("authorization failed: {0}")]
    AuthorizationFailed(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One page of a container listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSegment {
    pub names: Vec<String>,
    /// Opaque marker for the next page; `None` once the listing is exhausted.
    pub next_marker: Option<String>,
}

/// Operations the migration pipeline needs from a blob storage account.
///
/// Each handle is bound to one account; container and blob names are
/// passed per call.
#[async_trait]
pub trait BlobService: Send + Sync {
    /// Name of the account this handle talks to.
    fn account_name(&self) -> &str;

    /// Create `container` unless it exists. Returns `true` if it was created.
    async fn create_container_if_not_exists(&self, container: &str) -> StoreResult<bool>;

    /// Fetch one listing page, starting after `marker`.
    async fn list_blobs_segment(
        &self,
        container: &str,
        marker: Option<&str>,
        max_results: usize,
    ) -> StoreResult<ListSegment>;

    async fn get_properties(&self, container: &str, name: &str) -> StoreResult<BlobProperties>;

    /// Sign a URI granting `permissions` on a single blob until `expires_on`.
    fn sign_blob_uri(
        &self,
        container: &str,
        name: &str,
        permissions: SasPermissions,
        expires_on: DateTime<Utc>,
    ) -> StoreResult<SignedAccessGrant>;

    /// Begin an asynchronous copy of `source` into `container/name`.
    async fn start_copy_from_uri(
        &self,
        container: &str,
        name: &str,
        source: &Url,
    ) -> StoreResult<CopyState>;

    async fn get_copy_state(&self, container: &str, name: &str) -> StoreResult<CopyState>;

    /// Delete a blob. Returns `false` if it did not exist.
    async fn delete_if_exists(&self, container: &str, name: &str) -> StoreResult<bool>;
}
