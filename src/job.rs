//! Job identity and the per-job workspace layout.
//!
//! A [`Job`] is threaded explicitly through every pipeline step: it carries
//! the correlation id used in log lines, the document being converted and
//! the [`Workspace`] that owns all intermediate files.

use std::path::{Path, PathBuf};

use crate::error::BundleError;

/// File-name extension of published archives.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Name of the generated menu data file patched during assembly.
pub const MENU_DATA_FILE: &str = "menu_data.js";

/// Static asset trees copied into every bundle.
pub const STATIC_ASSET_DIRS: [&str; 3] = ["js", "css", "packages"];

/// A job-exclusive directory tree.
///
/// The identifier is the workspace's own leaf name, assigned by whoever
/// allocated the directory; archive names derive from it directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    id: String,
    root: PathBuf,
}

impl Workspace {
    /// Adopt a caller-allocated directory. The id is its final component.
    pub fn from_path(root: impl Into<PathBuf>) -> Result<Self, BundleError> {
        let root = root.into();
        let id = root
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                BundleError::InvalidConfig(format!(
                    "Workspace path '{}' has no usable leaf name",
                    root.display()
                ))
            })?
            .to_string();
        Ok(Self { id, root })
    }

    /// Allocate a fresh, uniquely named, empty directory under `temp_root`.
    ///
    /// The directory is not removed automatically; the pipeline finalizer
    /// owns its removal.
    pub fn allocate(temp_root: &Path) -> Result<Self, BundleError> {
        let dir = tempfile::Builder::new()
            .prefix("tmp")
            .tempdir_in(temp_root)
            .map_err(|e| BundleError::staging(temp_root, e))?;
        Self::from_path(dir.keep())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<id>.zip`
    pub fn archive_name(&self) -> String {
        format!("{}.{}", self.id, ARCHIVE_EXTENSION)
    }

    // ── Fixed layout ─────────────────────────────────────────────────────

    pub fn xml_dir(&self) -> PathBuf {
        self.root.join("XML")
    }

    pub fn edition_dir(&self) -> PathBuf {
        self.root.join("edition")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.edition_dir().join("static").join("data")
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.edition_dir().join("scripts")
    }

    pub fn transcription_dir(&self, doc_base_name: &str) -> PathBuf {
        self.edition_dir().join("transcription").join(doc_base_name)
    }

    pub fn menu_data_source(&self) -> PathBuf {
        self.data_dir().join(MENU_DATA_FILE)
    }

    /// Bundle root; its contents become the archive.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    pub fn output_static_dir(&self) -> PathBuf {
        self.output_dir().join("static")
    }

    pub fn output_json_dir(&self) -> PathBuf {
        self.output_dir().join("json")
    }

    pub fn menu_data_target(&self) -> PathBuf {
        self.output_static_dir().join("js").join(MENU_DATA_FILE)
    }
}

/// One execution of the pipeline for one document.
#[derive(Debug, Clone)]
pub struct Job {
    id: String,
    document_name: String,
    document_path: PathBuf,
    workspace: Workspace,
}

impl Job {
    /// A job whose document was uploaded into the workspace root, the
    /// convention used by the upload handler. The job id defaults to the
    /// workspace id.
    pub fn new(document_name: impl Into<String>, workspace: Workspace) -> Self {
        let document_name = document_name.into();
        Self {
            id: workspace.id().to_string(),
            document_path: workspace.root().join(&document_name),
            document_name,
            workspace,
        }
    }

    /// Override the correlation id (e.g. with the queue's task id).
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Override where the document currently lives.
    pub fn with_document_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.document_path = path.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    pub fn document_path(&self) -> &Path {
        &self.document_path
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Document name without its extension; names the stage-2 output dir.
    pub fn doc_base_name(&self) -> &str {
        Path::new(&self.document_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.document_name)
    }
}
