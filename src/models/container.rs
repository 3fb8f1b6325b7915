//! Represents a container, the top-level namespace for blobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A blob container inside one storage account.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Container {
    /// Unique identifier for this container (UUID for internal DB use).
    pub id: Uuid,

    /// Container name, unique within its account.
    pub name: String,

    /// When this container was created.
    pub created_at: DateTime<Utc>,
}
