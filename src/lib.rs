//! # edition-bundler
//!
//! Turn one uploaded XML edition into a browsable static bundle (paginated
//! JSON, HTML and static assets) and publish it as a zip archive.
//!
//! The transformation itself is done by two external scripts; this crate
//! orchestrates them. It gives every job an exclusive workspace, runs the
//! scripts in order, assembles their output with the shared front-end assets,
//! archives the result under a name derived from the workspace, and always
//! removes the workspace afterwards.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload.xml
//!  │
//!  ├─ 1. Staging   workspace skeleton, document moved into XML/
//!  ├─ 2. Stages    paginate → enrich, fail-fast on non-zero exit
//!  ├─ 3. Assembly  output/{json,static,index.html}, menu_data.js patched
//!  ├─ 4. Archive   <workspace id>.zip written atomically to the publish dir
//!  └─ 5. Cleanup   workspace removed on every exit path
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edition_bundler::{convert, BundleConfig, Job, Workspace};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BundleConfig::builder()
//!         .scripts_dir("/srv/edition/scripts")
//!         .static_dir("/srv/edition/static")
//!         .resources_dir("/srv/edition/resources")
//!         .publish_dir("/srv/edition/downloads")
//!         .build()?;
//!
//!     // The upload handler saved document123.xml into /tmp/tmpABC123/.
//!     let job = Job::new("document123.xml", Workspace::from_path("/tmp/tmpABC123")?);
//!     let output = convert(&job, &config).await?;
//!     assert_eq!(output.archive_name, "tmpABC123.zip");
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `edition-bundle` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod job;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{BundleConfig, BundleConfigBuilder, ResourceFile, StageSpec, MENU_DATA_MARKER};
pub use convert::{convert, convert_file, convert_sync};
pub use error::{BundleError, ErrorKind};
pub use job::{Job, Workspace};
pub use output::{BundleOutput, BundleStats, StageReport};
pub use pipeline::process::{ProcessOutput, ProcessRunner, StageCommand, TokioProcessRunner};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, PipelineStep, ProgressCallback};
