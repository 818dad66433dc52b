use clap::Args;
use glslopt_build::flags::BuildMode;
use serde::Serialize;

use crate::commands::{BuildOptions, CmdResult, GlobalArgs};

#[derive(Args, Default)]
pub struct FlagsArgs {
    #[command(flatten)]
    pub build: BuildOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagsOutput {
    pub mode: BuildMode,
    pub flags: String,
}

pub fn run(args: FlagsArgs, global: &GlobalArgs) -> CmdResult<FlagsOutput> {
    let config = args.build.resolve(global)?;

    Ok((
        FlagsOutput {
            mode: config.mode(),
            flags: config.rendered_flags(),
        },
        0,
    ))
}
