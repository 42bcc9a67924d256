//! HTTP DTOs for the file manager API.
//!
//! Request bodies keep the field names the browser client already sends; responses are
//! always wrapped in [`Envelope`].

use fileman_fsops::{EntryKind, ErrorDetail, OperationItem, OperationRequest};
use serde::{Deserialize, Serialize};

/// Uniform response body: `{data, success, errorMsg, error}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    /// Payload; `null` on failure.
    pub data: Option<T>,
    /// Whether the request as a whole succeeded.
    pub success: bool,
    /// Human-readable failure summary.
    pub error_msg: Option<String>,
    /// Structured failure detail.
    pub error: Option<ErrorDetail>,
}

impl<T> Envelope<T> {
    /// Successful envelope carrying `data`.
    pub const fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            success: true,
            error_msg: None,
            error: None,
        }
    }

    /// Failed envelope carrying a summary and detail.
    pub const fn failure(error_msg: String, error: Option<ErrorDetail>) -> Self {
        Self {
            data: None,
            success: false,
            error_msg: Some(error_msg),
            error,
        }
    }
}

/// Query string of `GET /filemanager/list`.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Logical directory; the root when absent.
    pub path: Option<String>,
}

/// Query string of `GET /filemanager/file/content`.
#[derive(Debug, Deserialize)]
pub struct ContentQuery {
    /// Logical file path.
    pub path: String,
}

/// Body of `POST /filemanager/dir/create`.
#[derive(Debug, Deserialize)]
pub struct CreateDirectoryRequest {
    /// Logical parent directory.
    #[serde(default)]
    pub path: String,
    /// Name of the directory to create.
    pub directory: String,
}

/// Body of `POST /filemanager/items/copy` and `POST /filemanager/items/move`.
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    /// Logical source directory.
    #[serde(default)]
    pub path: String,
    /// Entry names inside the source directory.
    #[serde(default)]
    pub filenames: Vec<String>,
    /// Logical destination directory.
    pub destination: Option<String>,
}

impl From<TransferRequest> for OperationRequest {
    fn from(request: TransferRequest) -> Self {
        Self {
            source_path: request.path,
            destination_path: request.destination,
            items: request
                .filenames
                .into_iter()
                .map(OperationItem::file)
                .collect(),
            recursive: None,
        }
    }
}

/// Body of `POST /filemanager/item/move`.
#[derive(Debug, Deserialize)]
pub struct ItemMoveRequest {
    /// Full logical path of the entry to move.
    pub path: String,
    /// Full logical target path.
    pub destination: String,
}

/// One entry selected for removal.
#[derive(Debug, Deserialize)]
pub struct SelectedFile {
    /// Entry name inside the source directory.
    pub name: String,
    /// Entry kind; `"dir"` selects directory removal.
    #[serde(rename = "type", default)]
    pub kind: EntryKind,
}

/// Body of `POST /filemanager/items/remove`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveRequest {
    /// Logical directory holding the entries.
    #[serde(default)]
    pub path: String,
    /// Entries to remove.
    #[serde(default)]
    pub selected_files: Vec<SelectedFile>,
    /// Whether non-empty directories may be removed.
    pub recursive: Option<bool>,
}

impl From<RemoveRequest> for OperationRequest {
    fn from(request: RemoveRequest) -> Self {
        Self {
            source_path: request.path,
            destination_path: None,
            items: request
                .selected_files
                .into_iter()
                .map(|selected| OperationItem {
                    name: selected.name,
                    kind: selected.kind,
                })
                .collect(),
            recursive: request.recursive,
        }
    }
}

/// Payload of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Always `"ok"` while the process serves requests.
    pub status: String,
    /// Build identifier recorded at startup.
    pub build: String,
}
