//! Staging: build the workspace skeleton and ingest the input document.

use crate::error::BundleError;
use crate::job::Job;
use crate::pipeline::fsops::{create_fresh_dir, move_file};
use std::path::PathBuf;
use tracing::debug;

/// Create the fixed directory skeleton and move the document into `XML/`.
///
/// Returns the document's new location. After this call the document no
/// longer exists at [`Job::document_path`].
pub fn build_staging_tree(job: &Job) -> Result<PathBuf, BundleError> {
    let ws = job.workspace();

    debug!("{}: create directory structure", job.id());
    for dir in [
        ws.xml_dir(),
        ws.data_dir(),
        ws.scripts_dir(),
        ws.output_static_dir(),
    ] {
        create_fresh_dir(&dir)?;
    }

    debug!("{}: add XML {}", job.id(), job.document_name());
    let dest = ws.xml_dir().join(job.document_name());
    move_file(job.document_path(), &dest)
        .map_err(|e| BundleError::staging(job.document_path(), e))?;

    Ok(dest)
}
