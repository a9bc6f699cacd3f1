//! Job entry points and the pipeline finalizer.
//!
//! [`convert`] runs staging, the external stages, assembly and archiving in
//! order, then removes the workspace no matter how the run ended. Removal is
//! owned by a [`WorkspaceGuard`]: the normal path closes it explicitly so a
//! removal failure can be logged, and its `Drop` covers panics and cancelled
//! futures.

use crate::config::BundleConfig;
use crate::error::BundleError;
use crate::job::{Job, Workspace};
use crate::output::{BundleOutput, BundleStats};
use crate::pipeline::{archive, assemble, stages, staging};
use crate::progress::PipelineStep;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert the job's document into a published archive.
///
/// The workspace must be an existing directory exclusive to this job; it is
/// gone when this function returns.
///
/// # Errors
/// The first failing step's error, after cleanup has been attempted. A
/// cleanup failure is logged and never replaces that error.
pub async fn convert(job: &Job, config: &BundleConfig) -> Result<BundleOutput, BundleError> {
    let total_start = Instant::now();
    info!("{}: conversion of {} started", job.id(), job.document_name());
    debug!("{}: scripts location: {}", job.id(), config.scripts_dir.display());
    debug!("{}: static location: {}", job.id(), config.static_dir.display());
    debug!("{}: resources location: {}", job.id(), config.resources_dir.display());
    debug!("{}: publish location: {}", job.id(), config.publish_dir.display());
    debug!("{}: workspace: {}", job.id(), job.workspace().root().display());

    if let Some(ref cb) = config.progress_callback {
        cb.on_job_start(job.id(), job.document_name());
    }

    let guard = WorkspaceGuard::new(job.workspace().root());
    let result = run_pipeline(job, config).await;

    // ── Cleanup (always) ─────────────────────────────────────────────────
    debug!("{}: delete the workspace", job.id());
    if let Some(ref cb) = config.progress_callback {
        cb.on_step_start(job.id(), &PipelineStep::Cleanup);
    }
    let cleanup_start = Instant::now();
    let cleanup = tokio::task::spawn_blocking(move || guard.close())
        .await
        .unwrap_or_else(|e| Err(BundleError::Internal(format!("Cleanup task panicked: {e}"))));
    let cleanup_ms = cleanup_start.elapsed().as_millis() as u64;

    finish(job, config, result, cleanup, cleanup_ms, total_start)
}

/// Report the cleanup outcome and settle the job's result.
///
/// A cleanup failure is logged and reported as a cleanup step error. It
/// never replaces `result`.
fn finish(
    job: &Job,
    config: &BundleConfig,
    result: Result<BundleOutput, BundleError>,
    cleanup: Result<(), BundleError>,
    cleanup_ms: u64,
    total_start: Instant,
) -> Result<BundleOutput, BundleError> {
    match cleanup {
        Ok(()) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_step_complete(job.id(), &PipelineStep::Cleanup, cleanup_ms);
            }
        }
        Err(e) => {
            match &result {
                Ok(_) => warn!("{}: {} (archive already published)", job.id(), e),
                Err(original) => warn!("{}: {} (job already failed: {})", job.id(), e, original),
            }
            if let Some(ref cb) = config.progress_callback {
                cb.on_step_error(job.id(), &PipelineStep::Cleanup, &e.to_string());
            }
        }
    }

    if let Some(ref cb) = config.progress_callback {
        cb.on_job_complete(job.id(), result.is_ok());
    }

    match result {
        Ok(mut output) => {
            output.stats.total_ms = total_start.elapsed().as_millis() as u64;
            info!(
                "{}: complete, archive {} ({} bytes) in {}ms",
                job.id(),
                output.archive_name,
                output.stats.archive_bytes,
                output.stats.total_ms
            );
            Ok(output)
        }
        Err(e) => {
            warn!("{}: conversion failed: {}", job.id(), e);
            Err(e)
        }
    }
}

/// Synchronous wrapper around [`convert`] for thread-based worker pools.
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(job: &Job, config: &BundleConfig) -> Result<BundleOutput, BundleError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| BundleError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(job, config))
}

/// Convert a caller-owned document.
///
/// Allocates a fresh workspace under [`BundleConfig::temp_root`], copies the
/// document into it (the original is left in place) and runs [`convert`].
pub async fn convert_file(
    document: impl AsRef<Path>,
    config: &BundleConfig,
) -> Result<BundleOutput, BundleError> {
    let document = document.as_ref();
    let name = document
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            BundleError::InvalidConfig(format!("Invalid document path '{}'", document.display()))
        })?
        .to_string();

    let workspace = Workspace::allocate(&config.temp_root)?;
    let upload = workspace.root().join(&name);
    if let Err(e) = tokio::fs::copy(document, &upload).await {
        if let Err(cleanup) = remove_workspace(workspace.root()) {
            warn!("{}: {}", workspace.id(), cleanup);
        }
        return Err(BundleError::staging(document, e));
    }

    convert(&Job::new(name, workspace), config).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run_pipeline(job: &Job, config: &BundleConfig) -> Result<BundleOutput, BundleError> {
    let mut stats = BundleStats::default();

    // ── Step 1: Staging tree ─────────────────────────────────────────────
    let ((), ms) = step(
        job,
        config,
        PipelineStep::Staging,
        blocking(job, config, |job, _| staging::build_staging_tree(job).map(|_| ())),
    )
    .await?;
    stats.staging_ms = ms;

    // ── Step 2: Install scripts, run external stages fail-fast ───────────
    let stages_start = Instant::now();
    let reports = stages::run_stages(job, config).await?;
    stats.stages_ms = stages_start.elapsed().as_millis() as u64;

    // ── Step 3: Assemble the bundle ──────────────────────────────────────
    let (copied, ms) = step(
        job,
        config,
        PipelineStep::Assembly,
        blocking(job, config, assemble::assemble_bundle),
    )
    .await?;
    stats.assembly_ms = ms;
    stats.copied_files = copied;

    // ── Step 4: Archive and publish ──────────────────────────────────────
    let (published, ms) = step(
        job,
        config,
        PipelineStep::Archive,
        blocking(job, config, |job, config| {
            archive::publish_archive(job, &config.publish_dir)
        }),
    )
    .await?;
    stats.archive_ms = ms;
    stats.archived_entries = published.entries;
    stats.archive_bytes = published.bytes;

    Ok(BundleOutput {
        archive_name: published.name,
        archive_path: published.path,
        stages: reports,
        stats,
    })
}

/// Time a step and report it to the progress callback.
async fn step<T>(
    job: &Job,
    config: &BundleConfig,
    step: PipelineStep,
    fut: impl Future<Output = Result<T, BundleError>>,
) -> Result<(T, u64), BundleError> {
    if let Some(ref cb) = config.progress_callback {
        cb.on_step_start(job.id(), &step);
    }
    let started = Instant::now();
    let result = fut.await;
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if let Some(ref cb) = config.progress_callback {
        match &result {
            Ok(_) => cb.on_step_complete(job.id(), &step, elapsed_ms),
            Err(e) => cb.on_step_error(job.id(), &step, &e.to_string()),
        }
    }
    result.map(|v| (v, elapsed_ms))
}

/// Run blocking filesystem work off the async worker threads.
async fn blocking<T, F>(job: &Job, config: &BundleConfig, f: F) -> Result<T, BundleError>
where
    F: FnOnce(&Job, &BundleConfig) -> Result<T, BundleError> + Send + 'static,
    T: Send + 'static,
{
    let job = job.clone();
    let config = config.clone();
    tokio::task::spawn_blocking(move || f(&job, &config))
        .await
        .map_err(|e| BundleError::Internal(format!("Blocking task panicked: {}", e)))?
}

/// Removes a workspace tree exactly once: on [`WorkspaceGuard::close`], or
/// on drop if never closed.
pub struct WorkspaceGuard {
    root: PathBuf,
    armed: bool,
}

impl WorkspaceGuard {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            armed: true,
        }
    }

    /// Remove the workspace now and report the outcome.
    pub fn close(mut self) -> Result<(), BundleError> {
        self.armed = false;
        remove_workspace(&self.root)
    }
}

impl Drop for WorkspaceGuard {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = remove_workspace(&self.root) {
                warn!("{}", e);
            }
        }
    }
}

/// Remove a workspace tree. An already-absent tree counts as removed.
fn remove_workspace(root: &Path) -> Result<(), BundleError> {
    match std::fs::remove_dir_all(root) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(BundleError::Cleanup {
            path: root.to_path_buf(),
            source,
        }),
    }
}
