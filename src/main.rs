use eframe::CreationContext;
use excel_merger::app::MergeApp;
use excel_merger::config::AppConfig;
use excel_merger::logging::init_logging;
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::from(2);
        }
    };

    let submit_options = match config.submit_options() {
        Ok(options) => options,
        Err(e) => {
            tracing::error!(error = %e, "invalid upload options");
            return ExitCode::from(2);
        }
    };

    // One worker: the upload and its progress ticker share a single thread.
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("merge-upload")
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([600.0, 560.0])
            .with_min_inner_size([420.0, 420.0]),
        ..Default::default()
    };

    let result = eframe::run_native(
        "Excel Merger",
        options,
        Box::new(move |cc: &CreationContext| {
            Box::new(MergeApp::new(cc, &config, submit_options, runtime))
        }),
    );

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "window closed with an error");
            ExitCode::FAILURE
        }
    }
}
