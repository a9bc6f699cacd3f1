//! External stages: copy the stage scripts into the workspace and run them
//! in order.
//!
//! Exit code is the only success signal an opaque program gives us, so the
//! first non-zero exit stops the job and its captured output travels with
//! the error for the operator.

use crate::config::{BundleConfig, StageSpec};
use crate::error::BundleError;
use crate::job::Job;
use crate::output::StageReport;
use crate::pipeline::process::StageCommand;
use crate::progress::PipelineStep;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Copy every stage script into `edition/scripts/`.
pub async fn install_scripts(job: &Job, config: &BundleConfig) -> Result<(), BundleError> {
    let scripts_dir = job.workspace().scripts_dir();
    debug!("{}: copy over scripts", job.id());
    for stage in &config.stages {
        let from = config.scripts_dir.join(&stage.script);
        tokio::fs::copy(&from, scripts_dir.join(&stage.script))
            .await
            .map_err(|e| BundleError::staging(&from, e))?;
    }
    Ok(())
}

/// Build the command line for `stage`, with scripts installed in `scripts_dir`.
pub fn stage_command(stage: &StageSpec, scripts_dir: &Path) -> StageCommand {
    match &stage.interpreter {
        Some(interpreter) => StageCommand {
            program: interpreter.into(),
            args: vec![stage.script.clone().into()],
        },
        None => StageCommand {
            program: scripts_dir.join(&stage.script).into_os_string(),
            args: vec![],
        },
    }
}

/// Install the stage scripts, then run every configured stage in order,
/// stopping at the first failure.
///
/// A script that cannot be installed is a [`BundleError::StagingSetup`]: no
/// stage has run yet.
pub async fn run_stages(job: &Job, config: &BundleConfig) -> Result<Vec<StageReport>, BundleError> {
    install_scripts(job, config).await?;
    let cwd = job.workspace().scripts_dir();
    let mut reports = Vec::with_capacity(config.stages.len());

    for (i, stage) in config.stages.iter().enumerate() {
        let index = i + 1;
        let step = PipelineStep::Stage {
            index,
            name: stage.name.clone(),
        };
        if let Some(ref cb) = config.progress_callback {
            cb.on_step_start(job.id(), &step);
        }

        let command = stage_command(stage, &cwd);
        debug!("{}: run {}", job.id(), command.display());
        let started = Instant::now();
        let result = config.runner.run(&cwd, &command).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let (exit_code, output) = match result {
            Ok(out) => (out.exit_code.unwrap_or(-1), out.output),
            Err(e) => (-1, format!("failed to launch `{}`: {e}", command.display())),
        };
        if !output.is_empty() {
            debug!("{}: {} output:\n{}", job.id(), stage.name, output);
        }

        if exit_code != 0 {
            warn!(
                "{}: stage {} ({}) failed with exit code {}",
                job.id(),
                index,
                stage.name,
                exit_code
            );
            let err = BundleError::ExternalStage {
                stage: index,
                name: stage.name.clone(),
                exit_code,
                output,
            };
            if let Some(ref cb) = config.progress_callback {
                cb.on_step_error(job.id(), &step, &err.to_string());
            }
            return Err(err);
        }

        info!("{}: stage {} ({}) done in {}ms", job.id(), index, stage.name, duration_ms);
        if let Some(ref cb) = config.progress_callback {
            cb.on_step_complete(job.id(), &step, duration_ms);
        }
        reports.push(StageReport {
            index,
            name: stage.name.clone(),
            exit_code,
            output,
            duration_ms,
        });
    }

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::process::{ProcessOutput, ProcessRunner};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Returns scripted exit codes in order and records every invocation.
    struct ScriptedRunner {
        codes: Mutex<Vec<std::io::Result<i32>>>,
        calls: Mutex<Vec<(std::path::PathBuf, String)>>,
    }

    impl ScriptedRunner {
        fn new(codes: Vec<std::io::Result<i32>>) -> Arc<Self> {
            Arc::new(Self {
                codes: Mutex::new(codes),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ProcessRunner for ScriptedRunner {
        async fn run(&self, cwd: &Path, command: &StageCommand) -> std::io::Result<ProcessOutput> {
            self.calls
                .lock()
                .unwrap()
                .push((cwd.to_path_buf(), command.display()));
            let code = self.codes.lock().unwrap().remove(0)?;
            Ok(ProcessOutput {
                exit_code: Some(code),
                output: format!("exit {code}"),
            })
        }
    }

    /// A staged workspace plus a scripts dir holding both default scripts.
    struct Fixture {
        _tmp: tempfile::TempDir,
        job: Job,
        scripts: std::path::PathBuf,
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let scripts = tmp.path().join("scripts");
        std::fs::create_dir_all(&scripts).unwrap();
        for stage in StageSpec::defaults() {
            std::fs::write(scripts.join(&stage.script), "# stage\n").unwrap();
        }
        let ws = crate::job::Workspace::from_path(tmp.path().join("tmpS")).unwrap();
        std::fs::create_dir_all(ws.scripts_dir()).unwrap();
        Fixture {
            _tmp: tmp,
            job: Job::new("doc.xml", ws),
            scripts,
        }
    }

    fn config(f: &Fixture, runner: Arc<ScriptedRunner>) -> BundleConfig {
        BundleConfig::builder()
            .scripts_dir(&f.scripts)
            .runner(runner)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn runs_stages_in_order_in_scripts_dir() {
        let f = fixture();
        let runner = ScriptedRunner::new(vec![Ok(0), Ok(0)]);
        let reports = run_stages(&f.job, &config(&f, runner.clone())).await.unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].index, 2);
        let scripts_dir = f.job.workspace().scripts_dir();
        assert!(scripts_dir.join("make_paginated_json.py").is_file());
        assert!(scripts_dir.join("add_html_to_paginated_json.py").is_file());
        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls[0].0, scripts_dir);
        assert_eq!(calls[0].1, "python3 make_paginated_json.py");
        assert_eq!(calls[1].1, "python3 add_html_to_paginated_json.py");
    }

    #[tokio::test]
    async fn first_failure_stops_the_sequence() {
        let f = fixture();
        let runner = ScriptedRunner::new(vec![Ok(1), Ok(0)]);
        let err = run_stages(&f.job, &config(&f, runner.clone())).await.unwrap_err();

        match err {
            BundleError::ExternalStage {
                stage,
                exit_code,
                ref output,
                ..
            } => {
                assert_eq!(stage, 1);
                assert_eq!(exit_code, 1);
                assert_eq!(output, "exit 1");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(runner.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn launch_failure_is_stage_error() {
        let f = fixture();
        let runner = ScriptedRunner::new(vec![Ok(0), Err(std::io::Error::other("ENOENT"))]);
        let err = run_stages(&f.job, &config(&f, runner)).await.unwrap_err();
        match err {
            BundleError::ExternalStage {
                stage,
                exit_code,
                output,
                ..
            } => {
                assert_eq!(stage, 2);
                assert_eq!(exit_code, -1);
                assert!(output.contains("ENOENT"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_script_fails_before_any_stage_runs() {
        let f = fixture();
        std::fs::remove_file(f.scripts.join("add_html_to_paginated_json.py")).unwrap();
        let runner = ScriptedRunner::new(vec![Ok(0), Ok(0)]);

        let err = run_stages(&f.job, &config(&f, runner.clone())).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::StagingSetup);
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn command_without_interpreter_runs_script_path() {
        let stage = StageSpec::new("paginate", "run.sh").with_interpreter(None);
        let cmd = stage_command(&stage, Path::new("/w/scripts"));
        assert_eq!(cmd.program, std::ffi::OsString::from("/w/scripts/run.sh"));
        assert!(cmd.args.is_empty());
    }
}
