mod state;
mod ui;

use crate::config::AppConfig;
use crate::download::ResultDownloader;
use crate::upload::{
    FileSelection, FileSelector, MergeResult, ProgressReceiver, SelectionError, SubmitOptions,
    UploadError, UploadOrchestrator,
};
use eframe::{egui, App};
pub use state::{ProgressView, StatusKind, StatusMessage, UiState};
use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

const REPAINT_WHILE_LOADING: Duration = Duration::from_millis(100);

pub struct MergeApp {
    selector: FileSelector,
    options: SubmitOptions,
    orchestrator: Arc<UploadOrchestrator>,
    progress_receiver: ProgressReceiver,
    downloader: ResultDownloader,
    runtime: Runtime,
    state: UiState,
}

impl MergeApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        config: &AppConfig,
        options: SubmitOptions,
        runtime: Runtime,
    ) -> Self {
        let (orchestrator, progress_receiver) =
            UploadOrchestrator::new(config.orchestrator_settings());
        tracing::info!(endpoint = %options.endpoint, "merge client ready");
        Self {
            selector: config.selector(),
            options,
            orchestrator: Arc::new(orchestrator),
            progress_receiver,
            downloader: config.downloader(),
            runtime,
            state: UiState::default(),
        }
    }

    pub fn pick_files(&mut self, paths: Vec<PathBuf>) {
        let result = self.selector.select_paths(&paths);
        self.apply_selection(result);
    }

    pub fn pick_folder(&mut self, folder: &Path) {
        let result = self.selector.select_folder(folder);
        self.apply_selection(result);
    }

    fn apply_selection(&mut self, result: Result<FileSelection, SelectionError>) {
        self.state.last_saved = None;
        match result {
            Ok(selection) => {
                tracing::info!(files = selection.len(), "archives selected");
                self.state.status = None;
                self.state.selection = Some(selection);
            }
            Err(e) => {
                tracing::warn!(error = %e, "selection rejected");
                self.state.selection = None;
                self.state.status = Some(StatusMessage::error(e.status_message()));
            }
        }
    }

    pub fn clear_selection(&mut self) {
        if !self.orchestrator.is_loading() {
            self.state.clear();
        }
    }

    pub fn can_merge(&self) -> bool {
        self.state.has_selection() && !self.orchestrator.is_loading() && !self.state.is_waiting()
    }

    pub fn start_merge(&mut self, ctx: &egui::Context) {
        let Some(selection) = self.state.selection.clone() else {
            let e = UploadError::from(SelectionError::EmptySelection);
            self.state.status = Some(StatusMessage::error(e.status_message()));
            return;
        };
        if self.state.is_waiting() {
            self.state.status = Some(StatusMessage::error(UploadError::SessionBusy.status_message()));
            return;
        }

        let (sender, receiver) = std_mpsc::channel();
        self.state.result_receiver = Some(receiver);
        self.state.last_saved = None;
        self.state.status = Some(StatusMessage::info("Uploading and merging files..."));

        let orchestrator = Arc::clone(&self.orchestrator);
        let options = self.options.clone();
        let ctx = ctx.clone();
        self.runtime.spawn(async move {
            let outcome = orchestrator.submit(&selection, &options).await;
            let _ = sender.send(outcome);
            ctx.request_repaint();
        });
    }

    pub fn update_state(&mut self, ctx: &egui::Context) {
        while let Ok(snapshot) = self.progress_receiver.try_recv() {
            self.orchestrator.accept_progress(&snapshot);
        }

        let received = self.state.result_receiver.as_ref().map(|r| r.try_recv());
        match received {
            Some(Ok(outcome)) => {
                self.state.result_receiver = None;
                self.finish_merge(outcome);
            }
            Some(Err(std_mpsc::TryRecvError::Disconnected)) => {
                // submit task ended without reporting, e.g. the runtime shut down
                self.state.result_receiver = None;
                self.state.status = Some(StatusMessage::error("Failed to merge Excel files."));
            }
            _ => {}
        }

        self.state.progress = ProgressView::from_session(
            &self.orchestrator.session(),
            self.orchestrator.estimator().assumed_max(),
        );

        if self.orchestrator.is_loading() || self.state.is_waiting() {
            ctx.request_repaint_after(REPAINT_WHILE_LOADING);
        }
    }

    fn finish_merge(&mut self, outcome: Result<MergeResult, UploadError>) {
        match outcome {
            Ok(result) => match self.downloader.deliver(result) {
                Ok(saved) => {
                    self.state.status =
                        Some(StatusMessage::success("Merged file downloaded successfully!"));
                    self.state.last_saved = Some(saved);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "merged file not saved");
                    self.state.status = Some(StatusMessage::error(e.status_message()));
                }
            },
            Err(e) => {
                self.state.status = Some(StatusMessage::error(e.status_message()));
            }
        }
    }
}

impl App for MergeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_state(ctx);
        self.render(ctx);
    }
}
