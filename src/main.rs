use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod output;
mod tty;

use commands::{config_cmd, flags, plan, run, GlobalArgs};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "glslopt-build")]
#[command(version = VERSION)]
#[command(about = "Build the GLSL optimizer with emscripten, one toolchain job at a time")]
struct Cli {
    /// JSON config file laid over the built-in defaults
    #[arg(long, global = true, env = "GLSLOPT_BUILD_CONFIG", value_name = "PATH")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a sequence and run its jobs in order, stopping at the first failure
    Run(run::RunArgs),
    /// Show the jobs a sequence would run
    Plan(plan::PlanArgs),
    /// Show the rendered toolchain flags
    Flags(flags::FlagsArgs),
    /// Show the effective configuration
    Config(config_cmd::ConfigArgs),
}

fn init_tracing() {
    // Progress goes to stderr; stdout carries the JSON response only.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn main() -> std::process::ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let global = GlobalArgs { config: cli.config };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);

    if let Err(err) = output::print_json_result(json_result) {
        tracing::error!("failed to write response: {}", err);
        return std::process::ExitCode::from(1);
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
