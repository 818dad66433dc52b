use clap::Args;
use glslopt_build::config::{self, BuildConfig, ConfigOverrides};
use glslopt_build::flags::{self as build_flags, BuildMode};

pub type CmdResult<T> = glslopt_build::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    pub config: Option<String>,
}

/// Overrides shared by every command that resolves a configuration.
#[derive(Args, Default, Debug)]
pub struct BuildOptions {
    /// Debug build: use the debug flags instead of the optimize flags
    #[arg(long, conflicts_with = "release")]
    pub debug: bool,

    /// Optimized build, even if the config file asks for debug
    #[arg(long)]
    pub release: bool,

    /// Toolchain executable to invoke
    #[arg(long, value_name = "PATH")]
    pub toolchain: Option<String>,

    /// Set a switch, e.g. --switch TOTAL_MEMORY=67108864 (repeatable)
    #[arg(long = "switch", value_name = "NAME=VALUE")]
    pub switches: Vec<String>,
}

impl BuildOptions {
    fn overrides(&self) -> glslopt_build::Result<ConfigOverrides> {
        let mode = match (self.debug, self.release) {
            (true, _) => Some(BuildMode::Debug),
            (false, true) => Some(BuildMode::Optimized),
            (false, false) => None,
        };

        let switches = self
            .switches
            .iter()
            .map(|raw| build_flags::parse_switch_assignment(raw))
            .collect::<glslopt_build::Result<Vec<_>>>()?;

        Ok(ConfigOverrides {
            toolchain: self.toolchain.clone(),
            mode,
            switches,
        })
    }

    /// Defaults, then the config file, then these overrides.
    pub(crate) fn resolve(&self, global: &GlobalArgs) -> glslopt_build::Result<BuildConfig> {
        let mut config = config::load(global.config.as_deref())?;
        config.apply_overrides(&self.overrides()?)?;
        Ok(config)
    }
}

pub mod config_cmd;
pub mod flags;
pub mod plan;
pub mod run;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (glslopt_build::Result<serde_json::Value>, i32) {
    crate::tty::status("glslopt-build is working...");

    match command {
        crate::Commands::Run(args) => dispatch!(args, global, run),
        crate::Commands::Plan(args) => dispatch!(args, global, plan),
        crate::Commands::Flags(args) => dispatch!(args, global, flags),
        crate::Commands::Config(args) => dispatch!(args, global, config_cmd),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global() -> GlobalArgs {
        GlobalArgs { config: None }
    }

    #[test]
    fn no_overrides_keeps_defaults() {
        let config = BuildOptions::default().resolve(&global()).unwrap();
        assert_eq!(config.mode(), BuildMode::Optimized);
        assert_eq!(
            config.rendered_flags(),
            "-O1 -s TOTAL_MEMORY=33554432 -s EMTERPRETIFY=1"
        );
    }

    #[test]
    fn debug_and_switches_override() {
        let options = BuildOptions {
            debug: true,
            switches: vec!["ALLOW_MEMORY_GROWTH=1".to_string()],
            ..BuildOptions::default()
        };
        let config = options.resolve(&global()).unwrap();
        assert_eq!(
            config.rendered_flags(),
            "-g -s TOTAL_MEMORY=33554432 -s EMTERPRETIFY=1 -s ALLOW_MEMORY_GROWTH=1"
        );
    }

    #[test]
    fn malformed_switch_is_rejected() {
        let options = BuildOptions {
            switches: vec!["TOTAL_MEMORY".to_string()],
            ..BuildOptions::default()
        };
        let err = options.resolve(&global()).unwrap_err();
        assert_eq!(err.code, glslopt_build::ErrorCode::ValidationInvalidArgument);
    }
}
