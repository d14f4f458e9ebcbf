use super::error::SelectionError;
use super::types::{FileHandle, FileSelection};
use glob::{MatchOptions, Pattern};
use ignore::Walk;
use std::fs;
use std::path::{Path, PathBuf};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Validates a raw pick of files against an extension whitelist.
#[derive(Debug, Clone)]
pub struct FileSelector {
    allowed: Vec<String>,
    patterns: Vec<Pattern>,
}

impl Default for FileSelector {
    fn default() -> Self {
        Self::new([".zip"])
    }
}

impl FileSelector {
    /// Extensions may be given with or without the leading dot.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed: Vec<String> = extensions
            .into_iter()
            .map(|e| {
                let e = e.as_ref().trim().to_lowercase();
                if e.starts_with('.') {
                    e
                } else {
                    format!(".{}", e)
                }
            })
            .collect();

        let patterns = allowed
            .iter()
            .filter_map(|ext| Pattern::new(&format!("?*{}", Pattern::escape(ext))).ok())
            .collect();

        Self { allowed, patterns }
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed
    }

    /// Extensions without the dot, for file dialog filters.
    pub fn dialog_filter(&self) -> Vec<&str> {
        self.allowed.iter().map(|e| e.trim_start_matches('.')).collect()
    }

    pub fn is_allowed(&self, file: &FileHandle) -> bool {
        file.extension().is_some()
            && self
                .patterns
                .iter()
                .any(|p| p.matches_with(&file.name, MATCH_OPTIONS))
    }

    /// Accepts the whole batch or rejects it; never a partial selection.
    pub fn select(&self, raw: Vec<FileHandle>) -> Result<FileSelection, SelectionError> {
        if raw.is_empty() {
            return Err(SelectionError::EmptySelection);
        }

        let rejected: Vec<String> = raw
            .iter()
            .filter(|f| !self.is_allowed(f))
            .map(|f| f.name.clone())
            .collect();

        if !rejected.is_empty() {
            tracing::debug!(rejected = ?rejected, "selection rejected");
            return Err(SelectionError::DisallowedExtension {
                files: rejected,
                allowed: self.allowed.clone(),
            });
        }

        Ok(FileSelection::accepted(raw))
    }

    /// Builds handles from picked paths, reading sizes from disk.
    pub fn select_paths<P: AsRef<Path>>(
        &self,
        paths: &[P],
    ) -> Result<FileSelection, SelectionError> {
        let handles = paths
            .iter()
            .map(|p| handle_for(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.select(handles)
    }

    /// Offers every regular file under `folder` as one batch.
    /// Entries excluded by `.gitignore` are not visited.
    pub fn select_folder(&self, folder: &Path) -> Result<FileSelection, SelectionError> {
        let mut paths: Vec<PathBuf> = Walk::new(folder)
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|entry| entry.into_path())
            .collect();
        paths.sort();
        self.select_paths(&paths)
    }
}

fn handle_for(path: &Path) -> Result<FileHandle, SelectionError> {
    let metadata = fs::metadata(path).map_err(|source| SelectionError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(FileHandle::new(path, metadata.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(name: &str) -> FileHandle {
        FileHandle::new(name, 10)
    }

    #[test]
    fn empty_selection_is_rejected() {
        let err = FileSelector::default().select(vec![]).unwrap_err();
        assert!(matches!(err, SelectionError::EmptySelection));
    }

    #[test]
    fn whole_batch_rejected_on_one_bad_file() {
        let err = FileSelector::default()
            .select(vec![handle("a.zip"), handle("b.pdf"), handle("c")])
            .unwrap_err();
        match err {
            SelectionError::DisallowedExtension { files, allowed } => {
                assert_eq!(files, vec!["b.pdf".to_string(), "c".to_string()]);
                assert_eq!(allowed, vec![".zip".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn accepts_all_zip_batch_in_order() {
        let selection = FileSelector::default()
            .select(vec![handle("b.zip"), handle("A.ZIP")])
            .unwrap();
        let names: Vec<_> = selection.files().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["b.zip", "A.ZIP"]);
        assert_eq!(selection.total_bytes(), 20);
    }

    #[test]
    fn custom_whitelist_without_dots() {
        let selector = FileSelector::new(["zip", "XLSX"]);
        assert_eq!(selector.allowed_extensions(), [".zip", ".xlsx"]);
        assert_eq!(selector.dialog_filter(), ["zip", "xlsx"]);
        assert!(selector.select(vec![handle("a.xlsx"), handle("b.zip")]).is_ok());
        assert!(selector.select(vec![handle("a.zip.pdf")]).is_err());
    }

    #[test]
    fn bare_extension_name_is_not_allowed() {
        assert!(!FileSelector::default().is_allowed(&handle(".zip")));
    }

    #[test]
    fn select_paths_reads_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.zip");
        fs::write(&path, vec![0u8; 1234]).unwrap();

        let selection = FileSelector::default().select_paths(&[&path]).unwrap();
        assert_eq!(selection.files()[0].size_bytes, 1234);
        assert_eq!(selection.files()[0].name, "one.zip");
    }

    #[test]
    fn select_paths_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileSelector::default()
            .select_paths(&[dir.path().join("gone.zip")])
            .unwrap_err();
        assert!(matches!(err, SelectionError::Unreadable { .. }));
    }

    #[test]
    fn select_folder_walks_files_sorted() {
        let dir = tempfile::Builder::new().prefix("merge").tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.zip"), b"b").unwrap();
        fs::write(dir.path().join("nested").join("a.zip"), b"a").unwrap();

        let selection = FileSelector::default().select_folder(dir.path()).unwrap();
        let mut names: Vec<_> = selection.files().iter().map(|f| f.name.clone()).collect();
        names.sort();
        assert_eq!(names, ["a.zip", "b.zip"]);
    }

    #[test]
    fn select_folder_rejects_mixed_content() {
        let dir = tempfile::Builder::new().prefix("merge").tempdir().unwrap();
        fs::write(dir.path().join("a.zip"), b"a").unwrap();
        fs::write(dir.path().join("notes.txt"), b"n").unwrap();

        let err = FileSelector::default().select_folder(dir.path()).unwrap_err();
        assert!(matches!(err, SelectionError::DisallowedExtension { .. }));
    }
}
