use clap::Args;
use glslopt_build::config::BuildConfig;

use crate::commands::{BuildOptions, CmdResult, GlobalArgs};

#[derive(Args, Default)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub build: BuildOptions,
}

/// Show the effective configuration after file and flag overrides.
pub fn run(args: ConfigArgs, global: &GlobalArgs) -> CmdResult<BuildConfig> {
    Ok((args.build.resolve(global)?, 0))
}
