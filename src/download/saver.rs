use super::DeliverError;
use rfd::FileDialog;
use std::path::PathBuf;

/// Where a delivered workbook should land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// A path the user chose explicitly; replaces an existing file.
    Exact(PathBuf),
    /// A directory; an existing file is never replaced, a numbered name is picked instead.
    InDirectory { dir: PathBuf, file_name: String },
}

/// Host capability that decides where a save goes.
pub trait ArtifactSaver: Send + Sync {
    fn destination(&self, suggested_name: &str) -> Result<Destination, DeliverError>;
}

/// Saves every result into one fixed directory.
#[derive(Debug, Clone)]
pub struct DirectorySaver {
    dir: PathBuf,
}

impl DirectorySaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ArtifactSaver for DirectorySaver {
    fn destination(&self, suggested_name: &str) -> Result<Destination, DeliverError> {
        Ok(Destination::InDirectory {
            dir: self.dir.clone(),
            file_name: suggested_name.to_string(),
        })
    }
}

/// Asks the user through the native "Save as" dialog.
#[derive(Debug, Clone, Default)]
pub struct DialogSaver {
    start_dir: Option<PathBuf>,
}

impl DialogSaver {
    pub fn new(start_dir: Option<PathBuf>) -> Self {
        Self { start_dir }
    }
}

impl ArtifactSaver for DialogSaver {
    fn destination(&self, suggested_name: &str) -> Result<Destination, DeliverError> {
        let mut dialog = FileDialog::new()
            .set_title("Save merged workbook")
            .set_file_name(suggested_name)
            .add_filter("Excel workbook", &["xlsx"]);
        if let Some(dir) = &self.start_dir {
            dialog = dialog.set_directory(dir);
        }
        dialog
            .save_file()
            .map(Destination::Exact)
            .ok_or(DeliverError::Cancelled)
    }
}

/// `report.xlsx`, `report (1).xlsx`, `report (2).xlsx`, ...
pub(crate) fn numbered_name(file_name: &str, n: usize) -> String {
    if n == 0 {
        return file_name.to_string();
    }
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => format!("{} ({}){}", &file_name[..idx], n, &file_name[idx..]),
        _ => format!("{} ({})", file_name, n),
    }
}
