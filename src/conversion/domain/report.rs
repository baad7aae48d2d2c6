//! Remote upload outcomes reported by the reporting API.

use serde::{Deserialize, Serialize};

/// Coarse state of an upload on the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteUploadState {
    /// Accepted and still being matched.
    InProgress,
    /// Matching finished.
    Completed,
    /// Matching failed.
    Failed,
}

impl RemoteUploadState {
    /// Maps a remote status name onto a coarse state.
    ///
    /// Returns `None` for names this client does not know.
    #[must_use]
    pub fn from_api_status(status: &str) -> Option<Self> {
        match status.trim().to_ascii_uppercase().as_str() {
            "PREPARED" | "UPLOADED" | "EXPORTED" | "MATCHED" => Some(Self::InProgress),
            "PROCESSED" => Some(Self::Completed),
            "LINKAGE_FAILURE" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Synchronous acceptance of an upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// Identifier assigned by the remote API.
    pub external_id: u64,
    /// Remote status name at acceptance.
    pub status: String,
    /// Number of lines the remote API counted, when reported.
    pub line_quantity: Option<u32>,
}

impl UploadReceipt {
    /// Returns the remote line count when it disagrees with the `sent` rows.
    ///
    /// A receipt without a line count never disagrees.
    #[must_use]
    pub fn line_mismatch(&self, sent: u32) -> Option<u32> {
        self.line_quantity.filter(|counted| *counted != sent)
    }
}

/// Outcome observed when polling an accepted upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    /// Coarse remote state.
    pub state: RemoteUploadState,
    /// Remote status name.
    pub status: String,
    /// Rows the remote API reports as processed.
    pub processed: u32,
    /// Row or upload level error details.
    pub errors: Vec<String>,
}
