//! Configuration types for the bundling pipeline.
//!
//! All pipeline behaviour is controlled through [`BundleConfig`], built via
//! its [`BundleConfigBuilder`]. One config value is shared by every job a
//! worker runs: it only names read-only source locations and the publish
//! directory, so cloning it across tasks is cheap and safe.

use crate::error::BundleError;
use crate::pipeline::process::{ProcessRunner, TokioProcessRunner};
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Line written over line 2 of `menu_data.js` so the front-end loader can
/// find the embedded JSON list regardless of how the document was named.
pub const MENU_DATA_MARKER: &str = "    \"json\": [";

/// Interpreter used for the stage scripts unless configured otherwise.
pub const DEFAULT_INTERPRETER: &str = "python3";

/// Configuration for the bundling pipeline.
///
/// # Example
/// ```rust
/// use edition_bundler::BundleConfig;
///
/// let config = BundleConfig::builder()
///     .scripts_dir("/srv/edition/scripts")
///     .static_dir("/srv/edition/static")
///     .resources_dir("/srv/edition/resources")
///     .publish_dir("/srv/edition/downloads")
///     .build()
///     .unwrap();
/// assert_eq!(config.stages.len(), 2);
/// ```
#[derive(Clone)]
pub struct BundleConfig {
    /// Directory holding the stage scripts. Read-only.
    pub scripts_dir: PathBuf,

    /// Directory holding the `js/`, `css/` and `packages/` asset trees
    /// copied into every bundle. Read-only.
    pub static_dir: PathBuf,

    /// Directory holding the single resource files (entry page, stylesheet,
    /// script). Read-only.
    pub resources_dir: PathBuf,

    /// Shared directory where finished archives are published.
    pub publish_dir: PathBuf,

    /// Root under which [`crate::convert::convert_file`] allocates workspaces.
    /// Default: the system temporary directory.
    pub temp_root: PathBuf,

    /// External stages, run in this order.
    pub stages: Vec<StageSpec>,

    /// Single files copied from `resources_dir` into the bundle.
    pub resource_files: Vec<ResourceFile>,

    /// Replacement for line 2 of the menu data file.
    pub menu_marker: String,

    /// Executes the stage programs.
    pub runner: Arc<dyn ProcessRunner>,

    /// Optional observer for step events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            scripts_dir: PathBuf::from("scripts"),
            static_dir: PathBuf::from("static"),
            resources_dir: PathBuf::from("resources"),
            publish_dir: PathBuf::from("downloads"),
            temp_root: std::env::temp_dir(),
            stages: StageSpec::defaults(),
            resource_files: ResourceFile::defaults(),
            menu_marker: MENU_DATA_MARKER.to_string(),
            runner: Arc::new(TokioProcessRunner),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for BundleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleConfig")
            .field("scripts_dir", &self.scripts_dir)
            .field("static_dir", &self.static_dir)
            .field("resources_dir", &self.resources_dir)
            .field("publish_dir", &self.publish_dir)
            .field("temp_root", &self.temp_root)
            .field("stages", &self.stages)
            .field("resource_files", &self.resource_files)
            .field("menu_marker", &self.menu_marker)
            .field("runner", &"<dyn ProcessRunner>")
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl BundleConfig {
    /// Create a new builder for `BundleConfig`.
    pub fn builder() -> BundleConfigBuilder {
        BundleConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`BundleConfig`].
#[derive(Debug)]
pub struct BundleConfigBuilder {
    config: BundleConfig,
}

impl BundleConfigBuilder {
    pub fn scripts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scripts_dir = dir.into();
        self
    }

    pub fn static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.static_dir = dir.into();
        self
    }

    pub fn resources_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.resources_dir = dir.into();
        self
    }

    pub fn publish_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.publish_dir = dir.into();
        self
    }

    pub fn temp_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_root = dir.into();
        self
    }

    pub fn stages(mut self, stages: Vec<StageSpec>) -> Self {
        self.config.stages = stages;
        self
    }

    /// Set the interpreter for every configured stage; `None` runs the
    /// scripts directly.
    pub fn interpreter(mut self, interpreter: Option<String>) -> Self {
        for stage in &mut self.config.stages {
            stage.interpreter = interpreter.clone();
        }
        self
    }

    pub fn resource_files(mut self, files: Vec<ResourceFile>) -> Self {
        self.config.resource_files = files;
        self
    }

    pub fn menu_marker(mut self, marker: impl Into<String>) -> Self {
        self.config.menu_marker = marker.into();
        self
    }

    pub fn runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.config.runner = runner;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BundleConfig, BundleError> {
        let c = &self.config;
        for (name, dir) in [
            ("scripts_dir", &c.scripts_dir),
            ("static_dir", &c.static_dir),
            ("resources_dir", &c.resources_dir),
            ("publish_dir", &c.publish_dir),
            ("temp_root", &c.temp_root),
        ] {
            if dir.as_os_str().is_empty() {
                return Err(BundleError::InvalidConfig(format!("{name} must not be empty")));
            }
        }
        if c.stages.is_empty() {
            return Err(BundleError::InvalidConfig(
                "At least one stage is required".into(),
            ));
        }
        if let Some(s) = c.stages.iter().find(|s| s.script.is_empty()) {
            return Err(BundleError::InvalidConfig(format!(
                "Stage '{}' has no script",
                s.name
            )));
        }
        if c.menu_marker.contains(['\n', '\r']) {
            return Err(BundleError::InvalidConfig(
                "Menu marker must be a single line".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Stage and resource descriptions ──────────────────────────────────────

/// One external transformation program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    /// Short name used in logs and errors.
    pub name: String,
    /// Script file name inside the scripts directory.
    pub script: String,
    /// Program used to run the script, e.g. `python3`. `None` executes the
    /// script itself.
    pub interpreter: Option<String>,
}

impl StageSpec {
    pub fn new(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: script.into(),
            interpreter: Some(DEFAULT_INTERPRETER.to_string()),
        }
    }

    pub fn with_interpreter(mut self, interpreter: Option<String>) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// The paginate stage followed by the markup-enrichment stage.
    pub fn defaults() -> Vec<StageSpec> {
        vec![
            StageSpec::new("paginate", "make_paginated_json.py"),
            StageSpec::new("enrich", "add_html_to_paginated_json.py"),
        ]
    }
}

/// A single file copied from the resources directory into the bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceFile {
    /// File name inside the resources directory.
    pub source: String,
    /// Destination relative to the bundle root (`output/`).
    pub dest: PathBuf,
}

impl ResourceFile {
    pub fn new(source: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
        }
    }

    pub fn defaults() -> Vec<ResourceFile> {
        vec![
            ResourceFile::new("index.html", "index.html"),
            ResourceFile::new("estoria.js", "static/js/estoria.js"),
            ResourceFile::new("estoria.css", "static/css/estoria.css"),
        ]
    }
}
