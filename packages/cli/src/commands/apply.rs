use super::{print_json, print_report, read_json, write_json};
use crate::config::Config;
use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use cord_editor::{rejected_targets, ChangeRequest, ProjectContents};
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Project snapshot (JSON)
    pub snapshot: PathBuf,

    /// Change request to apply (JSON)
    pub request: PathBuf,

    /// Write the resulting snapshot here
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Skip the conflict gate
    #[arg(long)]
    pub force: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

pub fn apply(args: ApplyArgs, config: &Config) -> Result<()> {
    let mut contents: ProjectContents = read_json(&args.snapshot)?;
    let request: ChangeRequest = read_json(&args.request)?;

    if config.enforce_conflict_gate && !args.force {
        let rejected = rejected_targets(&request, &contents);
        if !rejected.is_empty() {
            for target in &rejected {
                eprintln!("   {} {} {} ({:?})", "✗".red(), target.kind, target.id, target.reason);
            }
            bail!(
                "Change request {} is superseded by the snapshot (use --force to apply anyway)",
                request.change_marker.id
            );
        }
    }

    let report = contents.apply_change_request(&request)?;
    info!(marker = %request.change_marker.id, "Applied change request");

    if args.format == "json" {
        print_json(&report)?;
    } else {
        println!("🔧 {} {}", "Applied".green().bold(), request.change_marker.id);
        print_report(&report);
    }

    if let Some(output) = &args.output {
        write_json(output, &contents)?;
        if args.format != "json" {
            println!("   Snapshot: {}", output.display());
        }
    }

    Ok(())
}
