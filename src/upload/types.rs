use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// MIME type of the merged workbook returned by the merge service.
pub const SPREADSHEET_MIME: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// File name offered when saving the merged workbook.
pub const DEFAULT_OUTPUT_NAME: &str = "merged_output.xlsx";

/// Multipart field name each archive is sent under.
pub const FILES_FIELD: &str = "files";

/// A file the user picked, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,
}

impl FileHandle {
    pub fn new(path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            path,
            name,
            size_bytes,
        }
    }

    /// Suffix of the name starting at the last dot, lowercased (`".zip"`).
    /// Names without a dot, or with only a leading dot, have no extension.
    pub fn extension(&self) -> Option<String> {
        match self.name.rfind('.') {
            Some(idx) if idx > 0 => Some(self.name[idx..].to_lowercase()),
            _ => None,
        }
    }
}

/// A batch of files that passed validation as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSelection {
    files: Vec<FileHandle>,
}

impl FileSelection {
    pub(crate) fn accepted(files: Vec<FileHandle>) -> Self {
        Self { files }
    }

    pub fn files(&self) -> &[FileHandle] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }
}

/// Opaque token identifying one upload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Uploading,
    Succeeded,
    Failed,
    TimedOut,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Succeeded | SessionStatus::Failed | SessionStatus::TimedOut
        )
    }
}

/// The merged workbook handed back by the service. Consumed by value on delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
}

impl MergeResult {
    pub fn spreadsheet(bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: SPREADSHEET_MIME.to_string(),
            file_name: file_name.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressMode {
    Byte { loaded: u64, total: u64 },
    Time { elapsed: Duration },
}

/// One progress measurement, tagged with the session that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub session_id: SessionId,
    pub mode: ProgressMode,
}

#[derive(Debug, Clone)]
pub struct SubmitOptions {
    pub endpoint: reqwest::Url,
    /// `None` or zero disables the client-side timeout.
    pub timeout: Option<Duration>,
}

impl SubmitOptions {
    pub fn new(endpoint: reqwest::Url) -> Self {
        Self {
            endpoint,
            timeout: None,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(Duration::from_millis(timeout_ms));
        self
    }

    pub(crate) fn effective_timeout(&self) -> Option<Duration> {
        self.timeout.filter(|t| !t.is_zero())
    }
}
