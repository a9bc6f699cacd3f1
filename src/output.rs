//! Result types returned by a successful job.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What a successful job hands back to its caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleOutput {
    /// File name of the published archive, e.g. `tmpABC123.zip`.
    pub archive_name: String,
    /// Full path of the archive inside the publish directory.
    pub archive_path: PathBuf,
    /// One report per external stage, in execution order.
    pub stages: Vec<StageReport>,
    pub stats: BundleStats,
}

/// Outcome of one successful external stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    /// 1-based position in the stage sequence.
    pub index: usize,
    pub name: String,
    pub exit_code: i32,
    /// Captured stdout followed by stderr.
    pub output: String,
    pub duration_ms: u64,
}

/// Timing and size figures for one job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BundleStats {
    pub staging_ms: u64,
    pub stages_ms: u64,
    pub assembly_ms: u64,
    pub archive_ms: u64,
    pub total_ms: u64,
    /// Files copied into the bundle during assembly.
    pub copied_files: usize,
    /// Files and directories stored in the archive.
    pub archived_entries: usize,
    pub archive_bytes: u64,
}
