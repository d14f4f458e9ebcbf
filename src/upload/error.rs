use reqwest::StatusCode;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("No files selected")]
    EmptySelection,

    #[error("Files not allowed (expected {allowed:?}): {files:?}")]
    DisallowedExtension {
        files: Vec<String>,
        allowed: Vec<String>,
    },

    #[error("Cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SelectionError {
    pub fn status_message(&self) -> String {
        match self {
            SelectionError::EmptySelection => "Choose zip files first".to_string(),
            SelectionError::DisallowedExtension { files, allowed } => format!(
                "Only {} files are accepted. Remove: {}",
                allowed.join(", "),
                files.join(", ")
            ),
            SelectionError::Unreadable { path, .. } => {
                format!("Could not read {}", path.display())
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("An upload is already in progress")]
    SessionBusy,

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("No response within {after:?}")]
    Timeout { after: Duration },

    #[error("Merge service returned {status}: {message}")]
    Server { status: StatusCode, message: String },

    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl UploadError {
    /// Message shown in the status line.
    pub fn status_message(&self) -> String {
        match self {
            UploadError::Selection(e) => e.status_message(),
            UploadError::SessionBusy => "A merge is already running, please wait".to_string(),
            UploadError::Network(_) => {
                "Failed to merge Excel files: could not reach the merge service".to_string()
            }
            UploadError::Timeout { after } => format!(
                "Failed to merge Excel files: no response after {:.1}s",
                after.as_secs_f64()
            ),
            UploadError::Server { status, message } => format!(
                "Failed to merge Excel files: server returned {} ({})",
                status.as_u16(),
                message
            ),
            UploadError::FileRead { path, .. } => {
                format!("Failed to merge Excel files: could not read {}", path.display())
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, UploadError::Timeout { .. })
    }
}
