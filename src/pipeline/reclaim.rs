//! Removal of source blobs after a confirmed copy.

use crate::{
    models::object::ObjectReference,
    services::blob_service::{BlobService, StoreError},
};
use tracing::{error, info};

#[derive(Debug)]
pub enum ReclaimOutcome {
    Deleted,
    /// Someone else removed the blob first; not an error.
    AlreadyAbsent,
    /// The blob is still present. The destination copy is kept.
    Failed(StoreError),
}

/// Delete the source of a successfully copied blob.
///
/// Only call this once the copy has reached success. Failures are
/// reported to the caller and never retried.
pub async fn reclaim_source(service: &dyn BlobService, object: &ObjectReference) -> ReclaimOutcome {
    match service.delete_if_exists(&object.container, &object.name).await {
        Ok(true) => {
            info!(name = %object.name, container = %object.container, "source deleted");
            ReclaimOutcome::Deleted
        }
        Ok(false) => {
            info!(name = %object.name, container = %object.container, "source already absent");
            ReclaimOutcome::AlreadyAbsent
        }
        Err(err) => {
            error!(name = %object.name, error = %err, "source delete failed");
            ReclaimOutcome::Failed(err)
        }
    }
}
