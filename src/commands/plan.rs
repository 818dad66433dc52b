use clap::Args;
use glslopt_build::flags::BuildMode;
use glslopt_build::job::Job;
use serde::Serialize;

use crate::commands::{BuildOptions, CmdResult, GlobalArgs};

#[derive(Args, Default)]
pub struct PlanArgs {
    #[command(flatten)]
    pub build: BuildOptions,

    /// Sequence to show (defaults to the configured defaultSequence)
    #[arg(long)]
    pub sequence: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanOutput {
    pub sequence: String,
    pub mode: BuildMode,
    pub toolchain: String,
    pub flags: String,
    pub jobs: Vec<Job>,
}

/// Assemble the jobs of a sequence without running anything.
pub fn run(args: PlanArgs, global: &GlobalArgs) -> CmdResult<PlanOutput> {
    let config = args.build.resolve(global)?;
    let sequence = config.sequence(args.sequence.as_deref())?.id.clone();
    let jobs = config.assemble(Some(sequence.as_str()))?;

    Ok((
        PlanOutput {
            sequence,
            mode: config.mode(),
            toolchain: config.toolchain_path(),
            flags: config.rendered_flags(),
            jobs,
        },
        0,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn global() -> GlobalArgs {
        GlobalArgs { config: None }
    }

    #[test]
    fn falls_back_to_default_sequence() {
        let (plan, exit_code) = run(PlanArgs::default(), &global()).unwrap();

        assert_eq!(exit_code, 0);
        assert_eq!(plan.sequence, "combined");
        assert_eq!(plan.mode, BuildMode::Optimized);
        assert_eq!(plan.jobs.len(), 1);
        assert_eq!(plan.jobs[0].id(), "all");
        assert!(plan.jobs[0].command().ends_with(&plan.flags));
    }

    #[test]
    fn explicit_sequence_wins() {
        let args = PlanArgs {
            sequence: Some("staged".to_string()),
            ..PlanArgs::default()
        };
        let (plan, _) = run(args, &global()).unwrap();

        let ids: Vec<_> = plan.jobs.iter().map(|j| j.id()).collect();
        assert_eq!(ids, vec!["compile", "package"]);
    }

    #[test]
    fn config_file_default_sequence_is_used() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "defaultSequence": "staged", "debug": true }}"#).unwrap();
        let global = GlobalArgs {
            config: Some(file.path().to_string_lossy().to_string()),
        };

        let (plan, _) = run(PlanArgs::default(), &global).unwrap();

        assert_eq!(plan.sequence, "staged");
        assert_eq!(plan.mode, BuildMode::Debug);
        assert!(plan.flags.starts_with("-g "));
    }
}
