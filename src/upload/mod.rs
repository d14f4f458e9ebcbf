mod error;
mod orchestrator;
mod progress;
mod selector;
mod session;
mod types;

pub use error::{SelectionError, UploadError};
pub use orchestrator::{OrchestratorSettings, ProgressReceiver, UploadOrchestrator};
pub use progress::{byte_percent, time_percent, ByteCounter, ProgressEstimator, ProgressHandle};
pub use selector::FileSelector;
pub use session::UploadSession;
pub use types::{
    FileHandle, FileSelection, MergeResult, ProgressMode, ProgressSnapshot, SessionId,
    SessionStatus, SubmitOptions, DEFAULT_OUTPUT_NAME, FILES_FIELD, SPREADSHEET_MIME,
};
