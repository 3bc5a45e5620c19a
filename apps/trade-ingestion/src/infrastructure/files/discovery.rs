//! Directory discovery.

use std::fs;
use std::path::{Path, PathBuf};

use crate::application::ports::SourceError;

/// Regular files in `dir` whose extension is `extension`, in the order the
/// directory lists them. Subdirectories are not descended into.
pub fn list_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, SourceError> {
    let unreadable = |source| SourceError::DirectoryUnreadable {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            continue;
        }
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "h\n").unwrap();
        fs::write(dir.path().join("b.txt"), "h\n").unwrap();
        fs::write(dir.path().join("notes.md"), "x").unwrap();
        fs::write(dir.path().join("txt"), "x").unwrap();
        fs::create_dir(dir.path().join("nested.txt")).unwrap();

        let mut files = list_files(dir.path(), "txt").unwrap();
        files.sort();

        assert_eq!(
            files,
            vec![dir.path().join("a.txt"), dir.path().join("b.txt")]
        );
    }

    #[test]
    fn empty_directory_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_files(dir.path(), "txt").unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("b3Data");

        let err = list_files(&missing, "txt").unwrap_err();
        assert!(matches!(err, SourceError::DirectoryUnreadable { path, .. } if path == missing));
    }
}
