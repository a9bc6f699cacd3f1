//! Progress-callback trait for per-step pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::BundleConfigBuilder::progress_callback`] to observe a job
//! as it moves through staging, the external stages, assembly and archiving.
//! A worker pool can forward events to its job-status store; the CLI draws a
//! spinner.
//!
//! # Example
//!
//! ```rust
//! use edition_bundler::{BundleConfig, PipelineProgressCallback, PipelineStep};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     steps: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for CountingCallback {
//!     fn on_step_complete(&self, _job_id: &str, step: &PipelineStep, elapsed_ms: u64) {
//!         self.steps.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{step} done in {elapsed_ms}ms");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { steps: AtomicUsize::new(0) });
//!
//! let config = BundleConfig::builder()
//!     .progress_callback(counter as Arc<dyn PipelineProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::Arc;

/// One step of the pipeline, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineStep {
    Staging,
    /// External stage, 1-based.
    Stage { index: usize, name: String },
    Assembly,
    Archive,
    Cleanup,
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStep::Staging => f.write_str("staging"),
            PipelineStep::Stage { index, name } => write!(f, "stage {index} ({name})"),
            PipelineStep::Assembly => f.write_str("assembly"),
            PipelineStep::Archive => f.write_str("archive"),
            PipelineStep::Cleanup => f.write_str("cleanup"),
        }
    }
}

/// Called by the pipeline as a job progresses.
///
/// Jobs run concurrently, so one callback instance may receive events for
/// several jobs at once; `job_id` tells them apart. All methods default to
/// no-ops.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once before the workspace is touched.
    fn on_job_start(&self, job_id: &str, document_name: &str) {
        let _ = (job_id, document_name);
    }

    fn on_step_start(&self, job_id: &str, step: &PipelineStep) {
        let _ = (job_id, step);
    }

    fn on_step_complete(&self, job_id: &str, step: &PipelineStep, elapsed_ms: u64) {
        let _ = (job_id, step, elapsed_ms);
    }

    /// Called when a step fails; the job ends after cleanup.
    fn on_step_error(&self, job_id: &str, step: &PipelineStep, error: &str) {
        let _ = (job_id, step, error);
    }

    /// Called last, after the workspace has been removed (or removal failed).
    fn on_job_complete(&self, job_id: &str, success: bool) {
        let _ = (job_id, success);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BundleConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
