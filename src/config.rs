use crate::download::{DialogSaver, DirectorySaver, ResultDownloader};
use crate::upload::{
    FileSelector, OrchestratorSettings, SubmitOptions, DEFAULT_OUTPUT_NAME, FILES_FIELD,
};
use config::{Config, ConfigError, Environment, File};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "merger.toml";
pub const ENV_PREFIX: &str = "MERGER";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub upload: UploadConfig,
    pub selection: SelectionConfig,
    pub progress: ProgressConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub endpoint: String,
    /// Zero disables the client-side timeout.
    pub timeout_ms: u64,
    pub field_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    pub allowed_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    pub tick_interval_ms: u64,
    pub assumed_max_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub file_name: String,
    pub download_dir: Option<PathBuf>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4000/merge".to_string(),
            timeout_ms: 0,
            field_name: FILES_FIELD.to_string(),
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: vec![".zip".to_string()],
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            assumed_max_ms: 30_000,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file_name: DEFAULT_OUTPUT_NAME.to_string(),
            download_dir: None,
        }
    }
}

impl AppConfig {
    /// Defaults, then `merger.toml` if present, then `MERGER_*` variables
    /// (`MERGER_UPLOAD__TIMEOUT_MS=5000`).
    pub fn load() -> Result<Self, ConfigError> {
        let file = Path::new(CONFIG_FILE);
        Self::load_from(file.exists().then_some(file))
    }

    pub fn load_from(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let app_config: AppConfig = builder.build()?.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint()?;

        if self.upload.field_name.trim().is_empty() {
            return Err(ConfigError::Message(
                "Upload field name cannot be empty".to_string(),
            ));
        }

        if self.selection.allowed_extensions.is_empty() {
            return Err(ConfigError::Message(
                "At least one allowed extension is required".to_string(),
            ));
        }

        if self.progress.tick_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Progress tick interval must be greater than 0".to_string(),
            ));
        }

        if self.progress.assumed_max_ms == 0 {
            return Err(ConfigError::Message(
                "Assumed maximum duration must be greater than 0".to_string(),
            ));
        }

        if self.output.file_name.trim().is_empty() {
            return Err(ConfigError::Message(
                "Output file name cannot be empty".to_string(),
            ));
        }

        if self.upload.timeout_ms == 0 {
            tracing::debug!("no client-side upload timeout configured");
        }

        Ok(())
    }

    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.upload.endpoint).map_err(|e| {
            ConfigError::Message(format!("Invalid endpoint '{}': {}", self.upload.endpoint, e))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::Message(format!(
                "Endpoint must be http or https, got '{}'",
                other
            ))),
        }
    }

    pub fn submit_options(&self) -> Result<SubmitOptions, ConfigError> {
        Ok(SubmitOptions::new(self.endpoint()?).with_timeout_ms(self.upload.timeout_ms))
    }

    pub fn selector(&self) -> FileSelector {
        FileSelector::new(&self.selection.allowed_extensions)
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            tick_interval: Duration::from_millis(self.progress.tick_interval_ms),
            assumed_max: Duration::from_millis(self.progress.assumed_max_ms),
            field_name: self.upload.field_name.clone(),
            output_name: self.output.file_name.clone(),
        }
    }

    pub fn downloader(&self) -> ResultDownloader {
        match &self.output.download_dir {
            Some(dir) => ResultDownloader::new(DirectorySaver::new(dir)),
            None => ResultDownloader::new(DialogSaver::default()),
        }
    }
}
