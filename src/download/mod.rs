mod saver;

pub use saver::{ArtifactSaver, Destination, DialogSaver, DirectorySaver};

use crate::upload::MergeResult;
use saver::numbered_name;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

const MAX_NAME_ATTEMPTS: usize = 1000;

#[derive(Error, Debug)]
pub enum DeliverError {
    #[error("Save cancelled")]
    Cancelled,

    #[error("Failed to save merged file: {0}")]
    Io(#[from] io::Error),
}

impl DeliverError {
    pub fn status_message(&self) -> String {
        match self {
            DeliverError::Cancelled => "Merged file was not saved".to_string(),
            DeliverError::Io(e) => format!("Failed to save merged file: {}", e),
        }
    }
}

/// Payload bytes together with the MIME type they were declared as.
#[derive(Debug)]
struct TypedArtifact {
    bytes: Vec<u8>,
    mime_type: String,
}

/// A workbook written to disk by [`ResultDownloader::deliver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    pub path: PathBuf,
    pub size: u64,
    pub mime_type: String,
}

impl SavedArtifact {
    pub fn open(&self) -> io::Result<()> {
        open::that(&self.path)
    }

    pub fn reveal(&self) -> io::Result<()> {
        match self.path.parent() {
            Some(dir) => open::that(dir),
            None => open::that(&self.path),
        }
    }
}

/// Turns a merge result into exactly one saved file.
///
/// Bytes are staged in a temporary file next to the destination and renamed
/// into place; the staging file is removed on every path.
pub struct ResultDownloader {
    saver: Box<dyn ArtifactSaver>,
}

impl ResultDownloader {
    pub fn new(saver: impl ArtifactSaver + 'static) -> Self {
        Self {
            saver: Box::new(saver),
        }
    }

    pub fn deliver(&self, result: MergeResult) -> Result<SavedArtifact, DeliverError> {
        let destination = self.saver.destination(&result.file_name)?;
        let artifact = TypedArtifact {
            bytes: result.bytes,
            mime_type: result.mime_type,
        };

        let path = match destination {
            Destination::Exact(path) => {
                let staged = stage(dir_of(&path), &artifact)?;
                staged.persist(&path).map_err(|e| e.error)?;
                path
            }
            Destination::InDirectory { dir, file_name } => {
                fs::create_dir_all(&dir)?;
                let staged = stage(&dir, &artifact)?;
                persist_unique(staged, &dir, &file_name)?
            }
        };

        tracing::info!(
            path = %path.display(),
            bytes = artifact.bytes.len(),
            mime = %artifact.mime_type,
            "merged file saved"
        );

        Ok(SavedArtifact {
            path,
            size: artifact.bytes.len() as u64,
            mime_type: artifact.mime_type,
        })
    }
}

fn dir_of(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

fn stage(dir: &Path, artifact: &TypedArtifact) -> io::Result<NamedTempFile> {
    let mut staged = tempfile::Builder::new()
        .prefix(".merged-")
        .suffix(".part")
        .tempfile_in(dir)?;
    staged.write_all(&artifact.bytes)?;
    staged.as_file().sync_all()?;
    Ok(staged)
}

fn persist_unique(mut staged: NamedTempFile, dir: &Path, file_name: &str) -> io::Result<PathBuf> {
    for n in 0..MAX_NAME_ATTEMPTS {
        let candidate = dir.join(numbered_name(file_name, n));
        match staged.persist_noclobber(&candidate) {
            Ok(_) => return Ok(candidate),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => staged = e.file,
            Err(e) => return Err(e.error),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free name for {} in {}", file_name, dir.display()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::SPREADSHEET_MIME;

    fn staging_leftovers(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .count()
    }

    #[test]
    fn deliver_writes_payload_with_mime() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = ResultDownloader::new(DirectorySaver::new(dir.path()));

        let saved = downloader
            .deliver(MergeResult::spreadsheet(vec![7u8; 2048], "merged_output.xlsx"))
            .unwrap();

        assert_eq!(saved.path, dir.path().join("merged_output.xlsx"));
        assert_eq!(saved.size, 2048);
        assert_eq!(saved.mime_type, SPREADSHEET_MIME);
        assert_eq!(fs::read(&saved.path).unwrap(), vec![7u8; 2048]);
        assert_eq!(staging_leftovers(dir.path()), 0);
    }

    #[test]
    fn two_deliveries_do_not_interfere() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = ResultDownloader::new(DirectorySaver::new(dir.path()));

        let first = downloader
            .deliver(MergeResult::spreadsheet(b"first".to_vec(), "merged_output.xlsx"))
            .unwrap();
        let second = downloader
            .deliver(MergeResult::spreadsheet(b"second".to_vec(), "merged_output.xlsx"))
            .unwrap();

        assert_ne!(first.path, second.path);
        assert_eq!(second.path, dir.path().join("merged_output (1).xlsx"));
        assert_eq!(fs::read(&first.path).unwrap(), b"first");
        assert_eq!(fs::read(&second.path).unwrap(), b"second");
    }

    #[test]
    fn exact_destination_replaces_existing_file() {
        struct Fixed(PathBuf);
        impl ArtifactSaver for Fixed {
            fn destination(&self, _: &str) -> Result<Destination, DeliverError> {
                Ok(Destination::Exact(self.0.clone()))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("chosen.xlsx");
        fs::write(&target, b"old").unwrap();

        let saved = ResultDownloader::new(Fixed(target.clone()))
            .deliver(MergeResult::spreadsheet(b"new".to_vec(), "merged_output.xlsx"))
            .unwrap();

        assert_eq!(saved.path, target);
        assert_eq!(fs::read(&target).unwrap(), b"new");
        assert_eq!(staging_leftovers(dir.path()), 0);
    }

    #[test]
    fn cancelled_save_writes_nothing() {
        struct Cancel;
        impl ArtifactSaver for Cancel {
            fn destination(&self, _: &str) -> Result<Destination, DeliverError> {
                Err(DeliverError::Cancelled)
            }
        }

        let err = ResultDownloader::new(Cancel)
            .deliver(MergeResult::spreadsheet(vec![1], "merged_output.xlsx"))
            .unwrap_err();
        assert!(matches!(err, DeliverError::Cancelled));
    }

    #[test]
    fn creates_missing_download_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("exports").join("today");
        let saved = ResultDownloader::new(DirectorySaver::new(&nested))
            .deliver(MergeResult::spreadsheet(vec![1, 2, 3], "merged_output.xlsx"))
            .unwrap();
        assert!(saved.path.starts_with(&nested));
    }
}
