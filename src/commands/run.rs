use clap::Args;
use glslopt_build::flags::BuildMode;
use glslopt_build::job::Job;
use glslopt_build::log_status;
use glslopt_build::pipeline::{PipelineRunResult, PipelineRunner};
use glslopt_build::process::ShellSpawner;
use serde::Serialize;

use crate::commands::{BuildOptions, CmdResult, GlobalArgs};

#[derive(Args, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub build: BuildOptions,

    /// Sequence to run (defaults to the configured defaultSequence)
    #[arg(long)]
    pub sequence: Option<String>,

    /// Working directory for every job (the optimizer source root)
    #[arg(long, value_name = "DIR")]
    pub dir: Option<String>,

    /// Assemble the jobs without starting any process
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutput {
    pub sequence: String,
    pub mode: BuildMode,
    #[serde(flatten)]
    pub outcome: RunOutcome,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RunOutcome {
    Planned(PlannedRun),
    Ran(PipelineRunResult),
}

/// Jobs a dry run would have started; the pipeline never left `idle`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedRun {
    pub dry_run: bool,
    pub state: &'static str,
    pub jobs: Vec<Job>,
}

fn working_dir(dir: Option<&str>) -> Option<String> {
    dir.map(|dir| shellexpand::tilde(dir).to_string())
}

pub fn run(args: RunArgs, global: &GlobalArgs) -> CmdResult<RunOutput> {
    let config = args.build.resolve(global)?;
    let sequence = config.sequence(args.sequence.as_deref())?.id.clone();
    let jobs = config.assemble(Some(sequence.as_str()))?;
    let mode = config.mode();

    if args.dry_run {
        log_status!("run", "Dry run of sequence '{}' ({} jobs)", sequence, jobs.len());
        return Ok((
            RunOutput {
                sequence,
                mode,
                outcome: RunOutcome::Planned(PlannedRun {
                    dry_run: true,
                    state: "idle",
                    jobs,
                }),
            },
            0,
        ));
    }

    log_status!(
        "run",
        "Running sequence '{}' ({} jobs, {})",
        sequence,
        jobs.len(),
        mode
    );

    let mut spawner = ShellSpawner::new();
    if let Some(dir) = working_dir(args.dir.as_deref()) {
        spawner = spawner.in_dir(dir);
    }

    let mut runner = PipelineRunner::new(jobs, &spawner);
    let result = runner.run()?;

    Ok((
        RunOutput {
            sequence,
            mode,
            outcome: RunOutcome::Ran(result),
        },
        0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::map_cmd_result_to_json;

    fn global() -> GlobalArgs {
        GlobalArgs { config: None }
    }

    fn with_toolchain(toolchain: &str) -> RunArgs {
        RunArgs {
            build: BuildOptions {
                toolchain: Some(toolchain.to_string()),
                ..BuildOptions::default()
            },
            ..RunArgs::default()
        }
    }

    #[test]
    fn working_dir_expands_tilde() {
        let home = shellexpand::tilde("~").to_string();
        assert_eq!(
            working_dir(Some("~/glsl-optimizer")),
            Some(format!("{}/glsl-optimizer", home))
        );
        assert_eq!(working_dir(Some("/src/glsl")), Some("/src/glsl".to_string()));
        assert_eq!(working_dir(None), None);
    }

    #[cfg(unix)]
    #[test]
    fn dry_run_starts_nothing() {
        // `false` would fail the run if anything were spawned
        let args = RunArgs {
            dry_run: true,
            sequence: Some("staged".to_string()),
            ..with_toolchain("false")
        };

        let (output, exit_code) = run(args, &global()).unwrap();

        assert_eq!(exit_code, 0);
        assert_eq!(output.sequence, "staged");
        let RunOutcome::Planned(planned) = output.outcome else {
            panic!("dry run executed jobs");
        };
        assert_eq!(planned.state, "idle");
        let ids: Vec<_> = planned.jobs.iter().map(|j| j.id()).collect();
        assert_eq!(ids, vec!["compile", "package"]);
        assert!(planned.jobs[0].command().starts_with("false -Isrc"));
    }

    #[test]
    fn dry_run_serializes_jobs_and_idle_state() {
        let args = RunArgs {
            dry_run: true,
            ..RunArgs::default()
        };

        let (value, exit_code) = map_cmd_result_to_json(run(args, &global()));
        let value = value.unwrap();

        assert_eq!(exit_code, 0);
        assert_eq!(value["sequence"], "combined");
        assert_eq!(value["dryRun"], true);
        assert_eq!(value["state"], "idle");
        assert_eq!(value["jobs"][0]["id"], "all");
        assert!(value.get("summary").is_none());
    }

    #[test]
    fn unknown_sequence_is_not_found() {
        let args = RunArgs {
            dry_run: true,
            sequence: Some("nightly".to_string()),
            ..RunArgs::default()
        };

        let (value, exit_code) = map_cmd_result_to_json(run(args, &global()));
        assert!(value.is_err());
        assert_eq!(exit_code, 4);
    }

    #[cfg(unix)]
    #[test]
    fn failed_pipeline_exits_20() {
        let dir = tempfile::tempdir().unwrap();
        let args = RunArgs {
            dir: Some(dir.path().to_string_lossy().to_string()),
            ..with_toolchain("false")
        };

        let (value, exit_code) = map_cmd_result_to_json(run(args, &global()));

        let err = value.unwrap_err();
        assert_eq!(err.code, glslopt_build::ErrorCode::JobProcessFailed);
        assert_eq!(err.details["jobId"], "all");
        assert_eq!(exit_code, 20);
    }

    #[cfg(unix)]
    #[test]
    fn jobs_run_in_the_requested_dir() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("fake-emcc");
        std::fs::write(&tool, "#!/bin/sh\npwd > ran-here\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let args = RunArgs {
            dir: Some(dir.path().to_string_lossy().to_string()),
            ..with_toolchain(&tool.to_string_lossy())
        };

        let (output, exit_code) = run(args, &global()).unwrap();

        assert_eq!(exit_code, 0);
        let RunOutcome::Ran(result) = output.outcome else {
            panic!("expected the pipeline to run");
        };
        assert_eq!(result.summary.succeeded, 1);
        let recorded = std::fs::read_to_string(dir.path().join("ran-here")).unwrap();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(
            std::path::Path::new(recorded.trim()).canonicalize().unwrap(),
            expected
        );
    }
}
