use super::error::UploadError;
use super::progress::{ProgressEstimator, ProgressHandle};
use super::session::UploadSession;
use super::types::{
    FileSelection, MergeResult, ProgressSnapshot, SessionId, SessionStatus, SubmitOptions,
    DEFAULT_OUTPUT_NAME, FILES_FIELD,
};
use futures_util::TryStreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, StatusCode};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_util::io::ReaderStream;

const ARCHIVE_MIME: &str = "application/zip";

pub type ProgressReceiver = UnboundedReceiver<ProgressSnapshot>;

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub tick_interval: Duration,
    pub assumed_max: Duration,
    pub field_name: String,
    pub output_name: String,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            assumed_max: Duration::from_secs(30),
            field_name: FILES_FIELD.to_string(),
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct ServiceErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Owns the upload session and drives one merge request at a time.
#[derive(Debug)]
pub struct UploadOrchestrator {
    client: Client,
    session: Mutex<UploadSession>,
    loading: AtomicBool,
    estimator: ProgressEstimator,
    field_name: String,
    output_name: String,
}

impl UploadOrchestrator {
    pub fn new(settings: OrchestratorSettings) -> (Self, ProgressReceiver) {
        Self::with_client(Client::new(), settings)
    }

    /// The client must not carry its own request timeout; `SubmitOptions` decides that.
    pub fn with_client(client: Client, settings: OrchestratorSettings) -> (Self, ProgressReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let estimator = ProgressEstimator::new(settings.tick_interval, settings.assumed_max, sender);
        let orchestrator = Self {
            client,
            session: Mutex::new(UploadSession::default()),
            loading: AtomicBool::new(false),
            estimator,
            field_name: settings.field_name,
            output_name: settings.output_name,
        };
        (orchestrator, receiver)
    }

    pub fn estimator(&self) -> &ProgressEstimator {
        &self.estimator
    }

    /// Copy of the current session state.
    pub fn session(&self) -> UploadSession {
        self.lock_session().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Applies a tick only if it belongs to the session that is still uploading.
    pub fn accept_progress(&self, snapshot: &ProgressSnapshot) -> bool {
        let applied = self.lock_session().apply(snapshot);
        if !applied {
            tracing::trace!(session_id = %snapshot.session_id, "discarding stale progress tick");
        }
        applied
    }

    /// Replaces a terminal session with a fresh idle one.
    pub fn reset(&self) -> bool {
        let mut session = self.lock_session();
        if session.status().is_terminal() {
            *session = UploadSession::default();
            true
        } else {
            false
        }
    }

    /// Uploads the selection and returns the merged workbook.
    ///
    /// Fails with `SessionBusy`, without touching the network, while another
    /// submission is in flight.
    pub async fn submit(
        &self,
        selection: &FileSelection,
        options: &SubmitOptions,
    ) -> Result<MergeResult, UploadError> {
        let mut in_flight = self.begin()?;

        tracing::info!(
            session_id = %in_flight.session_id,
            files = selection.len(),
            bytes = selection.total_bytes(),
            endpoint = %options.endpoint,
            "uploading archives for merge"
        );

        let outcome = match options.effective_timeout() {
            Some(limit) => {
                match tokio::time::timeout(limit, self.send(selection, options, &in_flight.progress))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(UploadError::Timeout { after: limit }),
                }
            }
            None => self.send(selection, options, &in_flight.progress).await,
        };

        let status = match &outcome {
            Ok(_) => SessionStatus::Succeeded,
            Err(e) if e.is_timeout() => SessionStatus::TimedOut,
            Err(_) => SessionStatus::Failed,
        };
        in_flight.finish(status);

        match &outcome {
            Ok(result) => tracing::info!(
                session_id = %in_flight.session_id,
                bytes = result.size(),
                "merge succeeded"
            ),
            Err(e) => tracing::warn!(
                session_id = %in_flight.session_id,
                error = %e,
                ?status,
                "merge failed"
            ),
        }

        outcome
    }

    fn begin(&self) -> Result<InFlight<'_>, UploadError> {
        let now = Instant::now();
        let session_id = {
            let mut session = self.lock_session();
            if session.is_uploading() {
                tracing::warn!("submission rejected, session busy");
                return Err(UploadError::SessionBusy);
            }
            if session.status().is_terminal() {
                *session = UploadSession::default();
            }
            session.begin(now).ok_or(UploadError::SessionBusy)?
        };

        self.loading.store(true, Ordering::SeqCst);
        let progress = self.estimator.start(session_id, now);

        Ok(InFlight {
            orchestrator: self,
            session_id,
            progress,
            finished: false,
        })
    }

    async fn send(
        &self,
        selection: &FileSelection,
        options: &SubmitOptions,
        progress: &ProgressHandle,
    ) -> Result<MergeResult, UploadError> {
        let counter = progress.byte_counter(selection.total_bytes());
        let mut form = Form::new();

        for file in selection.files() {
            let handle = tokio::fs::File::open(&file.path)
                .await
                .map_err(|source| UploadError::FileRead {
                    path: file.path.clone(),
                    source,
                })?;

            let counter = counter.clone();
            let stream = ReaderStream::new(handle).inspect_ok(move |chunk| {
                counter.add(chunk.len() as u64);
            });

            let part = Part::stream_with_length(Body::wrap_stream(stream), file.size_bytes)
                .file_name(file.name.clone())
                .mime_str(ARCHIVE_MIME)
                .map_err(UploadError::Network)?;
            form = form.part(self.field_name.clone(), part);
        }

        let response = self
            .client
            .post(options.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(UploadError::Network)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(UploadError::Server {
                status,
                message: server_message(status, &body),
            });
        }

        let bytes = response.bytes().await.map_err(UploadError::Network)?;
        Ok(MergeResult::spreadsheet(bytes.to_vec(), self.output_name.clone()))
    }

    fn lock_session(&self) -> MutexGuard<'_, UploadSession> {
        // The session holds no invariants a panicking writer could break halfway.
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// One running submission. Dropping it stops progress, clears the loading
/// flag and, if no outcome was recorded, fails the session.
struct InFlight<'a> {
    orchestrator: &'a UploadOrchestrator,
    session_id: SessionId,
    progress: ProgressHandle,
    finished: bool,
}

impl InFlight<'_> {
    fn finish(&mut self, status: SessionStatus) {
        self.progress.stop();
        self.orchestrator
            .lock_session()
            .finish(self.session_id, status);
        self.finished = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(session_id = %self.session_id, "submission abandoned before completion");
            self.finish(SessionStatus::Failed);
        }
        self.orchestrator.loading.store(false, Ordering::SeqCst);
    }
}

fn server_message(status: StatusCode, body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ServiceErrorBody>(body) {
        if let Some(message) = parsed.error.or(parsed.message) {
            return message;
        }
    }
    match std::str::from_utf8(body).map(str::trim) {
        Ok(text) if !text.is_empty() && text.len() <= 200 => text.to_string(),
        _ => status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string(),
    }
}
