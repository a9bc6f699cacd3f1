//! CLI binary for edition-bundler.
//!
//! A thin shim over the library crate that maps CLI flags to `BundleConfig`,
//! runs one job and prints the published archive.

use anyhow::{Context, Result};
use clap::Parser;
use edition_bundler::{
    convert_file, BundleConfig, PipelineProgressCallback, PipelineStep, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner with one log line per finished step.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Bundling");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_job_start(&self, _job_id: &str, document_name: &str) {
        self.bar.set_message(document_name.to_string());
    }

    fn on_step_start(&self, _job_id: &str, step: &PipelineStep) {
        self.bar.set_message(step.to_string());
    }

    fn on_step_complete(&self, _job_id: &str, step: &PipelineStep, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<24} {}",
            green("✓"),
            step.to_string(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_step_error(&self, _job_id: &str, step: &PipelineStep, error: &str) {
        // First line only; the full error is printed on exit.
        let first = error.lines().next().unwrap_or(error);
        self.bar
            .println(format!("  {} {:<24} {}", red("✗"), step.to_string(), red(first)));
    }

    fn on_job_complete(&self, _job_id: &str, _success: bool) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Bundle an edition with the default python3 stage scripts
  edition-bundle document123.xml \
      --scripts-dir /srv/edition/scripts \
      --static-dir /srv/edition/static \
      --resources-dir /srv/edition/resources \
      --publish-dir /srv/edition/downloads

  # Run stage scripts directly (they carry their own shebang)
  edition-bundle --no-interpreter document123.xml

  # JSON result for scripting
  edition-bundle --json document123.xml > result.json

WORKSPACE:
  Each run allocates a fresh tmp* directory under --temp-root, copies the
  document into it, and removes it when done. The archive is named after that
  directory: /tmp/tmpABC123 publishes tmpABC123.zip.

ENVIRONMENT VARIABLES:
  EDITION_SCRIPTS_DIR     Directory with make_paginated_json.py and add_html_to_paginated_json.py
  EDITION_STATIC_DIR      Directory with js/, css/ and packages/
  EDITION_RESOURCES_DIR   Directory with index.html, estoria.js and estoria.css
  EDITION_PUBLISH_DIR     Directory receiving finished archives
  EDITION_TEMP_ROOT       Root for job workspaces (default: system temp dir)
  RUST_LOG                Overrides the log filter
"#;

/// Convert an XML edition into a zipped static bundle.
#[derive(Parser, Debug)]
#[command(
    name = "edition-bundle",
    version,
    about = "Convert an XML edition into a zipped, browsable static bundle",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// XML document to convert. It is copied, not moved.
    input: PathBuf,

    /// Directory holding the stage scripts.
    #[arg(long, env = "EDITION_SCRIPTS_DIR", default_value = "scripts")]
    scripts_dir: PathBuf,

    /// Directory holding the js/, css/ and packages/ asset trees.
    #[arg(long, env = "EDITION_STATIC_DIR", default_value = "static")]
    static_dir: PathBuf,

    /// Directory holding index.html, estoria.js and estoria.css.
    #[arg(long, env = "EDITION_RESOURCES_DIR", default_value = "resources")]
    resources_dir: PathBuf,

    /// Directory receiving the finished archive.
    #[arg(long, env = "EDITION_PUBLISH_DIR", default_value = "downloads")]
    publish_dir: PathBuf,

    /// Root under which the job workspace is allocated.
    #[arg(long, env = "EDITION_TEMP_ROOT")]
    temp_root: Option<PathBuf>,

    /// Interpreter used to run the stage scripts.
    #[arg(long, env = "EDITION_INTERPRETER", default_value = "python3")]
    interpreter: String,

    /// Execute the stage scripts directly instead of through an interpreter.
    #[arg(long)]
    no_interpreter: bool,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "EDITION_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "EDITION_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "EDITION_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress)?;

    // ── Run the job ──────────────────────────────────────────────────────
    let output = convert_file(&cli.input, &config)
        .await
        .with_context(|| format!("Conversion of {} failed", cli.input.display()))?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        println!("{}", output.archive_path.display());
        if !cli.quiet {
            eprintln!(
                "{}  {}  {} entries  {} bytes  {}ms",
                green("✔"),
                bold(&output.archive_name),
                output.stats.archived_entries,
                output.stats.archive_bytes,
                output.stats.total_ms,
            );
        }
    }

    Ok(())
}

/// Map CLI args to `BundleConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<BundleConfig> {
    let interpreter = if cli.no_interpreter {
        None
    } else {
        Some(cli.interpreter.clone())
    };

    let mut builder = BundleConfig::builder()
        .scripts_dir(&cli.scripts_dir)
        .static_dir(&cli.static_dir)
        .resources_dir(&cli.resources_dir)
        .publish_dir(&cli.publish_dir)
        .interpreter(interpreter);

    if let Some(ref root) = cli.temp_root {
        builder = builder.temp_root(root);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
