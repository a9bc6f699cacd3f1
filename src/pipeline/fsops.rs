//! Filesystem helpers shared by the staging and assembly steps.
//!
//! Directory copies go to a hidden `.<name>.partial` sibling first and are
//! renamed into place only once every file has been copied, so a later step
//! never sees a half-copied tree.

use crate::error::BundleError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Create `path` (and any missing parents). Fails if `path` itself exists.
pub fn create_fresh_dir(path: &Path) -> Result<(), BundleError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| BundleError::staging(parent, e))?;
    }
    std::fs::create_dir(path).map_err(|e| BundleError::staging(path, e))
}

/// Move a file, falling back to copy + remove across filesystems.
pub fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            std::fs::copy(from, to)?;
            std::fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}

/// Copy one file into the bundle. A missing source is an `Assembly` error.
pub fn copy_file(from: &Path, to: &Path) -> Result<(), BundleError> {
    if !from.is_file() {
        return Err(BundleError::Assembly {
            missing: from.to_path_buf(),
        });
    }
    std::fs::copy(from, to)
        .map(|_| ())
        .map_err(|source| BundleError::AssemblyCopy {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        })
}

/// Copy a whole directory tree to `to`, which must not exist yet.
///
/// Returns the number of files copied.
pub fn copy_dir(from: &Path, to: &Path) -> Result<usize, BundleError> {
    if !from.is_dir() {
        return Err(BundleError::Assembly {
            missing: from.to_path_buf(),
        });
    }
    let copy_err = |source: std::io::Error| BundleError::AssemblyCopy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };
    if to.exists() {
        return Err(copy_err(std::io::Error::new(
            ErrorKind::AlreadyExists,
            "destination already exists",
        )));
    }

    let partial = partial_path(to);
    let result = copy_tree(from, &partial).and_then(|files| {
        std::fs::rename(&partial, to)?;
        Ok(files)
    });
    match result {
        Ok(files) => {
            debug!("Copied {} files: {} -> {}", files, from.display(), to.display());
            Ok(files)
        }
        Err(e) => {
            if let Err(leftover) = discard_partial(&partial) {
                warn!(
                    "Failed to remove partial copy '{}': {}",
                    partial.display(),
                    leftover
                );
            }
            Err(copy_err(e))
        }
    }
}

/// Remove an abandoned `.partial` tree. An absent tree counts as removed.
fn discard_partial(partial: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(partial) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn partial_path(to: &Path) -> PathBuf {
    let name = to
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    to.with_file_name(format!(".{name}.partial"))
}

fn copy_tree(from: &Path, to: &Path) -> std::io::Result<usize> {
    let mut files = 0;
    for entry in WalkDir::new(from).follow_links(true) {
        let entry = entry.map_err(std::io::Error::other)?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .map_err(std::io::Error::other)?;
        let dest = to.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest)?;
        } else {
            std::fs::copy(entry.path(), &dest)?;
            files += 1;
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind as Kind;

    #[test]
    fn copy_dir_copies_nested_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        std::fs::create_dir_all(src.join("a/b")).unwrap();
        std::fs::write(src.join("top.txt"), "1").unwrap();
        std::fs::write(src.join("a/b/deep.txt"), "2").unwrap();

        let dst = tmp.path().join("out/dst");
        std::fs::create_dir_all(tmp.path().join("out")).unwrap();
        assert_eq!(copy_dir(&src, &dst).unwrap(), 2);
        assert_eq!(std::fs::read_to_string(dst.join("a/b/deep.txt")).unwrap(), "2");
        assert!(!tmp.path().join("out/.dst.partial").exists());
    }

    #[test]
    fn discard_partial_removes_tree_and_tolerates_absence() {
        let tmp = tempfile::tempdir().unwrap();
        let partial = tmp.path().join(".json.partial");
        std::fs::create_dir_all(partial.join("nested")).unwrap();
        std::fs::write(partial.join("nested/1r.json"), "{}").unwrap();

        discard_partial(&partial).unwrap();
        assert!(!partial.exists());
        discard_partial(&partial).unwrap();
    }

    #[test]
    fn discard_partial_reports_unremovable_path() {
        let tmp = tempfile::tempdir().unwrap();
        let not_a_dir = tmp.path().join(".json.partial");
        std::fs::write(&not_a_dir, "stray").unwrap();
        assert!(discard_partial(&not_a_dir).is_err());
    }

    #[test]
    fn copy_dir_missing_source_is_assembly_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = copy_dir(&tmp.path().join("nope"), &tmp.path().join("dst")).unwrap_err();
        match err {
            BundleError::Assembly { missing } => assert!(missing.ends_with("nope")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!tmp.path().join("dst").exists());
    }

    #[test]
    fn copy_dir_refuses_existing_destination() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::create_dir_all(&dst).unwrap();
        assert_eq!(copy_dir(&src, &dst).unwrap_err().kind(), Kind::Assembly);
    }

    #[test]
    fn create_fresh_dir_rejects_existing() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("x/y");
        create_fresh_dir(&dir).unwrap();
        assert_eq!(create_fresh_dir(&dir).unwrap_err().kind(), Kind::StagingSetup);
    }

    #[test]
    fn copy_file_missing_source() {
        let tmp = tempfile::tempdir().unwrap();
        let err = copy_file(&tmp.path().join("index.html"), &tmp.path().join("o.html"))
            .unwrap_err();
        assert_eq!(err.kind(), Kind::Assembly);
    }
}
