use super::types::{ProgressMode, ProgressSnapshot, SessionId, SessionStatus};
use std::time::{Duration, Instant};

/// State of the single upload attempt the orchestrator owns.
///
/// Status only moves `Idle -> Uploading -> {Succeeded | Failed | TimedOut}`;
/// a terminal session must be replaced by a fresh one before the next begin.
#[derive(Debug, Clone)]
pub struct UploadSession {
    id: Option<SessionId>,
    status: SessionStatus,
    started_at: Option<Instant>,
    elapsed: Duration,
    bytes_loaded: Option<u64>,
    bytes_total: Option<u64>,
}

impl Default for UploadSession {
    fn default() -> Self {
        Self {
            id: None,
            status: SessionStatus::Idle,
            started_at: None,
            elapsed: Duration::ZERO,
            bytes_loaded: None,
            bytes_total: None,
        }
    }
}

impl UploadSession {
    pub fn id(&self) -> Option<SessionId> {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn bytes(&self) -> Option<(u64, u64)> {
        self.bytes_loaded.zip(self.bytes_total)
    }

    pub fn is_uploading(&self) -> bool {
        self.status == SessionStatus::Uploading
    }

    /// Enters `Uploading` under a fresh id. Only valid from `Idle`.
    pub(crate) fn begin(&mut self, now: Instant) -> Option<SessionId> {
        if self.status != SessionStatus::Idle {
            return None;
        }
        let id = SessionId::generate();
        self.id = Some(id);
        self.status = SessionStatus::Uploading;
        self.started_at = Some(now);
        self.elapsed = Duration::ZERO;
        Some(id)
    }

    /// Moves to a terminal status. Ignored unless `id` is the uploading session.
    pub(crate) fn finish(&mut self, id: SessionId, status: SessionStatus) -> bool {
        debug_assert!(status.is_terminal());
        if !self.is_uploading() || self.id != Some(id) {
            return false;
        }
        if let Some(started) = self.started_at {
            self.elapsed = self.elapsed.max(started.elapsed());
        }
        self.status = status;
        true
    }

    /// Applies a tick if it belongs to the uploading session.
    pub(crate) fn apply(&mut self, snapshot: &ProgressSnapshot) -> bool {
        if !self.is_uploading() || self.id != Some(snapshot.session_id) {
            return false;
        }
        match snapshot.mode {
            ProgressMode::Time { elapsed } => {
                self.elapsed = self.elapsed.max(elapsed);
            }
            ProgressMode::Byte { loaded, total } => {
                self.bytes_loaded = Some(loaded);
                self.bytes_total = Some(total);
            }
        }
        true
    }
}
