use crate::download::SavedArtifact;
use crate::upload::{
    byte_percent, time_percent, FileSelection, MergeResult, SessionStatus, UploadError,
    UploadSession,
};
use crate::utils::file_size::format_size;
use derivative::Derivative;
use std::sync::mpsc::Receiver;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Info,
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Success,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Error,
        }
    }
}

/// What the progress bar shows for the current session.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressView {
    /// `0.0..=1.0`
    pub fraction: f32,
    pub label: String,
}

impl ProgressView {
    /// Byte counts win over the time heuristic once the transport reports them.
    pub fn from_session(session: &UploadSession, assumed_max: Duration) -> Option<Self> {
        if session.status() != SessionStatus::Uploading {
            return None;
        }
        let elapsed = format!("{:.1}s", session.elapsed().as_secs_f32());
        let view = match session.bytes() {
            Some((loaded, total)) if total > 0 => {
                let pct = byte_percent(loaded, total);
                Self {
                    fraction: pct / 100.0,
                    label: format!(
                        "Upload progress: {:.0}% ({} / {}) · {}",
                        pct,
                        format_size(loaded),
                        format_size(total),
                        elapsed
                    ),
                }
            }
            _ => {
                let pct = time_percent(session.elapsed(), assumed_max);
                Self {
                    fraction: pct / 100.0,
                    label: format!("Merging... {}", elapsed),
                }
            }
        };
        Some(view)
    }
}

#[derive(Derivative, Default)]
#[derivative(Debug)]
pub struct UiState {
    pub selection: Option<FileSelection>,
    pub status: Option<StatusMessage>,
    pub progress: Option<ProgressView>,
    pub last_saved: Option<SavedArtifact>,
    #[derivative(Debug = "ignore")]
    pub result_receiver: Option<Receiver<Result<MergeResult, UploadError>>>,
}

impl UiState {
    pub fn clear(&mut self) {
        *self = UiState::default();
    }

    pub fn has_selection(&self) -> bool {
        self.selection.as_ref().map_or(false, |s| !s.is_empty())
    }

    pub fn is_waiting(&self) -> bool {
        self.result_receiver.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::{ProgressMode, ProgressSnapshot};
    use std::time::Instant;

    #[test]
    fn idle_session_has_no_progress() {
        let session = UploadSession::default();
        assert!(ProgressView::from_session(&session, Duration::from_secs(30)).is_none());
    }

    #[test]
    fn state_clear_drops_everything() {
        let mut state = UiState {
            status: Some(StatusMessage::error("boom")),
            ..Default::default()
        };
        state.clear();
        assert!(state.status.is_none());
        assert!(!state.has_selection());
        assert!(!state.is_waiting());
    }

    #[test]
    fn byte_counts_override_time_heuristic() {
        let mut session = UploadSession::default();
        let id = session.begin(Instant::now()).unwrap();

        let time_view = ProgressView::from_session(&session, Duration::from_secs(30)).unwrap();
        assert!(time_view.label.starts_with("Merging"));

        session.apply(&ProgressSnapshot {
            session_id: id,
            mode: ProgressMode::Byte {
                loaded: 5,
                total: 10,
            },
        });
        let byte_view = ProgressView::from_session(&session, Duration::from_secs(30)).unwrap();
        assert_eq!(byte_view.fraction, 0.5);
        assert!(byte_view.label.contains("50%"));
    }

    #[test]
    fn time_view_uses_assumed_max() {
        let mut session = UploadSession::default();
        let id = session.begin(Instant::now()).unwrap();
        session.apply(&ProgressSnapshot {
            session_id: id,
            mode: ProgressMode::Time {
                elapsed: Duration::from_secs(15),
            },
        });
        let view = ProgressView::from_session(&session, Duration::from_secs(30)).unwrap();
        assert_eq!(view.fraction, 0.5);
    }
}
