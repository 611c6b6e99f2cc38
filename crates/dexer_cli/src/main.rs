//! Dexer CLI: plans the dex actions of one module.
//!
//! `dexer plan` prints a module's build actions as JSON or ninja text, and
//! `dexer flags` prints only the derived tool flags and the files they read.

#![warn(missing_docs)]

mod flags;
mod pipeline;
mod plan;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;

use clap::builder::NonEmptyStringValueParser;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Dexer: build-action compiler for dexing Java bytecode.
#[derive(Parser, Debug)]
#[command(name = "dexer", version, about = "Dex build-action compiler")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// How diagnostics are written to stderr.
    #[arg(long, global = true, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Plan a module's dex actions.
    Plan(PlanArgs),
    /// Print the flags derived for a module's dex tool.
    Flags(ModuleArgs),
}

/// Inputs describing one module's dexing request.
#[derive(Args, Debug)]
pub struct ModuleArgs {
    /// Module directory containing `dex.toml`.
    #[arg(long)]
    pub module: PathBuf,

    /// The compiled classes archive to dex.
    #[arg(long)]
    pub classes_jar: String,

    /// File name of the produced jar.
    #[arg(long, default_value = "javalib.jar", value_parser = NonEmptyStringValueParser::new())]
    pub jar_name: String,

    /// The module's output directory.
    #[arg(long)]
    pub out_dir: String,

    /// Boot classpath jar (repeatable, in order).
    #[arg(long)]
    pub boot_classpath: Vec<String>,

    /// Extra classpath jar (repeatable, in order).
    #[arg(long)]
    pub classpath: Vec<String>,

    /// Header jar of a dependency that raises the optimizer's library level.
    #[arg(long)]
    pub proguard_raise: Vec<String>,

    /// Optimizer flag file exported by a library dependency.
    #[arg(long)]
    pub extra_flags_file: Vec<String>,

    /// Optimizer flag file from any other generator.
    #[arg(long)]
    pub other_flags_file: Vec<String>,

    /// Optimizer flag file generated by aapt.
    #[arg(long)]
    pub aapt_flags_file: Vec<String>,

    /// Path to a `toolchain.toml` overriding tool locations.
    #[arg(long)]
    pub toolchain: Option<PathBuf>,
}

/// Arguments for the `dexer plan` subcommand.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// The module to plan.
    #[command(flatten)]
    pub module: ModuleArgs,

    /// Output format for the planned actions.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Format of diagnostics written to stderr.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    /// rustc-style text.
    Human,
    /// One JSON object per line.
    Json,
}

/// Output format for planned actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Action descriptors as JSON.
    Json,
    /// Ninja `rule` and `build` statements.
    Ninja,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Whether diagnostics are written as JSON lines.
    pub json_messages: bool,
}

/// Installs the stderr log subscriber.
///
/// `--quiet` and `--verbose` pick the level; otherwise `RUST_LOG` does,
/// falling back to warnings only.
fn init_tracing(global: &GlobalArgs) {
    let filter = if global.quiet {
        EnvFilter::new("error")
    } else if global.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(global.color)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::io::stderr().is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        json_messages: cli.message_format == MessageFormat::Json,
    };
    init_tracing(&global);

    let result = match cli.command {
        Command::Plan(ref args) => plan::run(args, &global),
        Command::Flags(ref args) => flags::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
