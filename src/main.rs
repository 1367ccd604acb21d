use clap::{Parser, Subcommand};

use commands::GlobalArgs;

mod commands;
mod output;
mod tty;

use commands::{build, clean, init, list, test};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "kata")]
#[command(version = VERSION)]
#[command(about = "Build, test and clean single-file kata exercises")]
struct Cli {
    /// Path to Kata.toml (default: nearest one in this directory or above)
    #[arg(long, global = true, value_name = "PATH")]
    manifest: Option<String>,

    /// Always invoke the compiler, ignoring and not updating the build cache
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile production executables
    Build(build::BuildArgs),
    /// Compile test executables
    Test(test::TestArgs),
    /// Remove build artifacts and output directories
    Clean(clean::CleanArgs),
    /// Show declared pipelines and which artifacts exist
    #[command(visible_alias = "ls")]
    List(list::ListArgs),
    /// Write a starter Kata.toml
    Init(init::InitArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let global = GlobalArgs {
        manifest: cli.manifest,
        no_cache: cli.no_cache,
    };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    let _ = output::print_json_result(json_result);

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
