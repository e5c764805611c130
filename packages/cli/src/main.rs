mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    apply, check, expand, flatten, invert, merge_overrides, replay, ApplyArgs, CheckArgs,
    ExpandArgs, FlattenArgs, InvertArgs, MergeArgs, ReplayArgs,
};
use config::Config;
use tracing::Level;

/// Cord CLI - inspect and replay project change requests
#[derive(Parser, Debug)]
#[command(name = "cord")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a change request to a snapshot
    Apply(ApplyArgs),

    /// Print the request that undoes a change request
    Invert(InvertArgs),

    /// Run the conflict gate for a change request
    Check(CheckArgs),

    /// Apply a sequence of change requests, optionally undoing some
    Replay(ReplayArgs),

    /// Compute the rendered properties of a symbol instance
    MergeOverrides(MergeArgs),

    /// Flatten a nested update into dot-notation
    Flatten(FlattenArgs),

    /// Expand a dot-notation map into a nested update
    Expand(ExpandArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = run(cli);

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?.display().to_string();
    let config = Config::load(&cwd)?;

    let level = if cli.verbose { Level::DEBUG } else { config.level() };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Apply(args) => apply(args, &config),
        Command::Invert(args) => invert(args),
        Command::Check(args) => check(args),
        Command::Replay(args) => replay(args, &config),
        Command::MergeOverrides(args) => merge_overrides(args),
        Command::Flatten(args) => flatten(args, &config),
        Command::Expand(args) => expand(args),
    }
}
