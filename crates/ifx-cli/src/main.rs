//! ifx - image filter CLI
//!
//! Opens a preview window that applies filter kernels on key presses, or
//! runs a filter chain headless and writes the result.

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use ifx_compute::Backend;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "ifx")]
#[command(author, version, about = "Image filters on compute devices")]
#[command(long_about = "
Applies image filters (invert, grayscale, binary, acos, sepia, Gaussian blur,
channel extraction) through compute kernels. Filters chain on the device.

Examples:
  ifx view                               # open nature.jpg, keys 0-9
  ifx view photo.png -o out.png
  ifx apply photo.jpg -o out.jpg 5 6     # sepia, then blur
  ifx --backend cpu apply in.jpg -o out.png 2 3
  ifx backends
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Compute backend: auto, cpu or wgpu
    #[arg(short, long, global = true, default_value = "auto")]
    backend: Backend,

    /// Kernel source file (defaults to $IFX_KERNEL_PATH or kernels/filters.wgsl)
    #[arg(short, long, global = true)]
    kernels: Option<PathBuf>,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the preview window and filter interactively
    #[cfg(feature = "viewer")]
    #[command(visible_alias = "v")]
    View(ViewArgs),

    /// Apply a chain of filters without a window
    #[command(visible_alias = "a")]
    Apply(ApplyArgs),

    /// List compute backends
    Backends,
}

#[cfg(feature = "viewer")]
#[derive(Args)]
struct ViewArgs {
    /// Input image (JPEG or PNG)
    #[arg(default_value = "nature.jpg")]
    input: PathBuf,

    /// Where to save the result if confirmed
    #[arg(short, long, default_value = "result.jpg")]
    output: PathBuf,
}

#[derive(Args)]
struct ApplyArgs {
    /// Input image (JPEG or PNG)
    input: PathBuf,

    /// Output image
    #[arg(short, long)]
    output: PathBuf,

    /// Menu digits, applied in order (e.g. `5 6` or `56`)
    #[arg(required = true)]
    commands: Vec<String>,
}

/// Installs the fmt subscriber. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        #[cfg(feature = "viewer")]
        Commands::View(args) => commands::view::run(args, cli.backend, cli.kernels.as_deref()),
        Commands::Apply(args) => commands::apply::run(args, cli.backend, cli.kernels.as_deref()),
        Commands::Backends => commands::backends::run(cli.verbose),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error[{}]: {e:#}", commands::error_code(&e));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_apply_with_globals() {
        let cli = Cli::try_parse_from(["ifx", "-vv", "--backend", "cpu", "apply", "in.jpg", "-o", "out.png", "5", "6"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.backend, Backend::Cpu);
        let Commands::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert_eq!(args.commands, vec!["5", "6"]);
        assert_eq!(args.output, PathBuf::from("out.png"));
    }

    #[test]
    fn apply_needs_commands() {
        assert!(Cli::try_parse_from(["ifx", "apply", "in.jpg", "-o", "out.jpg"]).is_err());
    }

    #[test]
    fn rejects_unknown_backend() {
        assert!(Cli::try_parse_from(["ifx", "--backend", "cuda", "backends"]).is_err());
    }

    #[cfg(feature = "viewer")]
    #[test]
    fn view_defaults() {
        let cli = Cli::try_parse_from(["ifx", "view"]).unwrap();
        let Commands::View(args) = cli.command else {
            panic!("expected view");
        };
        assert_eq!(args.input, PathBuf::from("nature.jpg"));
        assert_eq!(args.output, PathBuf::from("result.jpg"));
    }
}
