//! Represents a blob (object) stored in a container.

use crate::models::copy::{CopyState, CopyStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// System properties of a blob, as returned by a property fetch.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BlobProperties {
    pub last_modified: DateTime<Utc>,
    pub size_bytes: u64,
    pub content_type: Option<String>,
    pub etag: Option<String>,
}

/// Identifies one blob within a container.
///
/// References are produced by listing without properties. The selector
/// attaches a snapshot fetched straight from the service; that snapshot may
/// go stale before the blob is transferred.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ObjectReference {
    /// Owning container.
    pub container: String,

    /// Blob name, unique within the container.
    pub name: String,

    /// Properties captured during selection.
    pub properties: Option<BlobProperties>,
}

impl ObjectReference {
    pub fn new(container: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            name: name.into(),
            properties: None,
        }
    }

    pub fn with_properties(mut self, properties: BlobProperties) -> Self {
        self.properties = Some(properties);
        self
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.properties.as_ref().map(|p| p.last_modified)
    }
}

/// A blob row in the local account's metadata database.
///
/// The `copy_*` columns are populated while (and after) the blob is the
/// destination of a service-side copy.
#[derive(Clone, FromRow, Debug)]
pub struct BlobRecord {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Foreign key linking to the parent container.
    pub container_id: Uuid,

    pub name: String,

    /// Content type (MIME type).
    pub content_type: Option<String>,

    /// Size in bytes.
    pub size_bytes: i64,

    /// MD5 of the payload, absent while a copy is still pending.
    pub etag: Option<String>,

    pub last_modified: DateTime<Utc>,

    /// Soft-delete marker.
    pub is_deleted: bool,

    pub copy_id: Option<String>,
    pub copy_status: Option<String>,
    /// Source URI of the last copy, stored without its signature.
    pub copy_source: Option<String>,
    pub copy_bytes_copied: Option<i64>,
    pub copy_total_bytes: Option<i64>,
    pub copy_status_description: Option<String>,
}

impl BlobRecord {
    pub fn properties(&self) -> BlobProperties {
        BlobProperties {
            last_modified: self.last_modified,
            size_bytes: self.size_bytes.max(0) as u64,
            content_type: self.content_type.clone(),
            etag: self.etag.clone(),
        }
    }

    /// The copy state recorded on this row, if it was ever a copy target.
    pub fn copy_state(&self) -> Option<CopyState> {
        let copy_id = self.copy_id.clone()?;
        let status = self.copy_status.as_deref().and_then(CopyStatus::parse)?;
        Some(CopyState {
            copy_id,
            status,
            bytes_copied: self.copy_bytes_copied.map(|v| v.max(0) as u64),
            total_bytes: self.copy_total_bytes.map(|v| v.max(0) as u64),
            status_description: self.copy_status_description.clone(),
        })
    }
}
