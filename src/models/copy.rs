//! Service-side copy status as reported by the destination service.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a service-side copy.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CopyStatus {
    Pending,
    Success,
    Failed,
    Aborted,
}

impl CopyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CopyStatus::Pending => "pending",
            CopyStatus::Success => "success",
            CopyStatus::Failed => "failed",
            CopyStatus::Aborted => "aborted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(CopyStatus::Pending),
            "success" => Some(CopyStatus::Success),
            "failed" => Some(CopyStatus::Failed),
            "aborted" => Some(CopyStatus::Aborted),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, CopyStatus::Pending)
    }
}

impl fmt::Display for CopyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation of a copy's progress.
///
/// `total_bytes` may be unknown until the destination has resolved the
/// source length.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CopyState {
    pub copy_id: String,
    pub status: CopyStatus,
    pub bytes_copied: Option<u64>,
    pub total_bytes: Option<u64>,
    pub status_description: Option<String>,
}

impl CopyState {
    pub fn pending(copy_id: impl Into<String>, bytes_copied: u64, total_bytes: Option<u64>) -> Self {
        Self {
            copy_id: copy_id.into(),
            status: CopyStatus::Pending,
            bytes_copied: Some(bytes_copied),
            total_bytes,
            status_description: None,
        }
    }

    pub fn success(copy_id: impl Into<String>, total_bytes: u64) -> Self {
        Self {
            copy_id: copy_id.into(),
            status: CopyStatus::Success,
            bytes_copied: Some(total_bytes),
            total_bytes: Some(total_bytes),
            status_description: None,
        }
    }

    pub fn failed(copy_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            copy_id: copy_id.into(),
            status: CopyStatus::Failed,
            bytes_copied: None,
            total_bytes: None,
            status_description: Some(description.into()),
        }
    }
}
