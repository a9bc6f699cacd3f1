//! Archiving: zip the bundle and publish it under the workspace's name.
//!
//! The archive is written to a temporary file inside the publish directory
//! and renamed to its final name only once complete, so a download link can
//! never point at a half-written zip. The rename refuses to replace an
//! existing archive: published archives are immutable.

use crate::error::BundleError;
use crate::job::Job;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// A published archive.
#[derive(Debug, Clone)]
pub struct PublishedArchive {
    pub name: String,
    pub path: PathBuf,
    /// Files and directories stored in the archive.
    pub entries: usize,
    pub bytes: u64,
}

/// Zip the contents of `output/` into `<publish_dir>/<workspace id>.zip`.
pub fn publish_archive(job: &Job, publish_dir: &Path) -> Result<PublishedArchive, BundleError> {
    let name = job.workspace().archive_name();
    let dest = publish_dir.join(&name);
    debug!("{}: zip up the result to {}", job.id(), dest.display());

    let tmp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".partial")
        .tempfile_in(publish_dir)
        .map_err(|e| BundleError::archive(&dest, e))?;

    let entries = write_zip(&job.workspace().output_dir(), tmp.as_file())
        .map_err(|e| BundleError::archive(&dest, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| BundleError::archive(&dest, e))?;

    // On failure the temp file is deleted when `PersistError` drops.
    let file = tmp
        .persist_noclobber(&dest)
        .map_err(|e| BundleError::archive(&dest, e.error))?;
    let bytes = file
        .metadata()
        .map(|m| m.len())
        .map_err(|e| BundleError::archive(&dest, e))?;

    Ok(PublishedArchive {
        name,
        path: dest,
        entries,
        bytes,
    })
}

/// Write every file and directory under `root` to a zip, paths relative to
/// `root`, in sorted order with fixed timestamps.
pub fn write_zip<W: Write + Seek>(
    root: &Path,
    writer: W,
) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());
    let mut zip = ZipWriter::new(writer);
    let mut entries = 0;

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let name = entry_name(root, entry.path())?;
        if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
        } else {
            zip.start_file(name, options)?;
            let mut file = std::fs::File::open(entry.path())?;
            std::io::copy(&mut file, &mut zip)?;
        }
        entries += 1;
    }

    zip.finish()?;
    Ok(entries)
}

fn entry_name(root: &Path, path: &Path) -> Result<String, std::path::StripPrefixError> {
    let rel = path.strip_prefix(root)?;
    Ok(rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}
