//! Shared HTTP constants (headers, route paths, client-facing messages).

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
pub(crate) const HEADER_UPLOAD_PATH: &str = "path";
pub(crate) const HEADER_REQUESTED_WITH: &str = "x-requested-with";

pub(crate) const UPLOAD_FIELD: &str = "file[]";

pub(crate) const MSG_INVALID_REQUEST: &str = "The request could not be understood";
pub(crate) const MSG_LIST_FAILED: &str = "An error occurred listing the folder";
pub(crate) const MSG_CREATE_FAILED: &str = "An error occurred creating the folder";
pub(crate) const MSG_DOWNLOAD_FAILED: &str = "An error occurred downloading the file";
pub(crate) const MSG_COPY_FAILED: &str = "An error occurred copying files";
pub(crate) const MSG_MOVE_FAILED: &str = "An error occurred moving files";
pub(crate) const MSG_RENAME_FAILED: &str = "An error occurred renaming file";
pub(crate) const MSG_UPLOAD_FAILED: &str = "An error occurred uploading files";
pub(crate) const MSG_UPLOAD_EMPTY: &str = "Cannot find any file to upload";
pub(crate) const MSG_REMOVE_FAILED: &str = "An error occurred removing files";
