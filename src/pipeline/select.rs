//! Last-modified selection of candidate blobs.

use crate::{
    models::object::ObjectReference,
    pipeline::enumerate::list_blobs,
    services::blob_service::{BlobService, StoreResult},
};
use chrono::{DateTime, Utc};
use futures::{StreamExt, pin_mut};
use std::fmt;
use tracing::{debug, info};

/// Direction of the cutoff comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Select when `last_modified <= cutoff`.
    NotModifiedSince,
    /// Select when `last_modified > cutoff`.
    ModifiedSince,
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionMode::NotModifiedSince => f.write_str("not modified since"),
            SelectionMode::ModifiedSince => f.write_str("modified since"),
        }
    }
}

/// A cutoff instant plus the direction it is applied in. Fixed per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionCriterion {
    pub cutoff: DateTime<Utc>,
    pub mode: SelectionMode,
}

impl SelectionCriterion {
    pub fn new(cutoff: DateTime<Utc>, mode: SelectionMode) -> Self {
        Self { cutoff, mode }
    }

    pub fn not_modified_since(cutoff: DateTime<Utc>) -> Self {
        Self::new(cutoff, SelectionMode::NotModifiedSince)
    }

    pub fn modified_since(cutoff: DateTime<Utc>) -> Self {
        Self::new(cutoff, SelectionMode::ModifiedSince)
    }

    pub fn matches(&self, last_modified: DateTime<Utc>) -> bool {
        match self.mode {
            SelectionMode::NotModifiedSince => last_modified <= self.cutoff,
            SelectionMode::ModifiedSince => last_modified > self.cutoff,
        }
    }
}

impl fmt::Display for SelectionCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.mode, self.cutoff.to_rfc3339())
    }
}

/// Enumerate `container` and keep the blobs matching `criterion`.
///
/// Properties are fetched per blob rather than trusted from the listing, and
/// the whole candidate list is materialised before returning. Any listing or
/// property failure, including a blob deleted since it was listed, ends the
/// selection.
pub async fn select_blobs(
    service: &dyn BlobService,
    container: &str,
    criterion: &SelectionCriterion,
    page_size: usize,
) -> StoreResult<Vec<ObjectReference>> {
    let listing = list_blobs(service, container, page_size);
    pin_mut!(listing);

    let mut examined = 0usize;
    let mut selected = Vec::new();
    while let Some(candidate) = listing.next().await {
        let candidate = candidate?;
        examined += 1;

        let properties = service.get_properties(container, &candidate.name).await?;

        if criterion.matches(properties.last_modified) {
            debug!(name = %candidate.name, last_modified = %properties.last_modified, "selected");
            selected.push(candidate.with_properties(properties));
        }
    }

    info!(
        container,
        examined,
        selected = selected.len(),
        criterion = %criterion,
        "selection complete"
    );
    Ok(selected)
}
