use super::{print_json, read_json};
use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;
use cord_editor::{rejected_targets, ChangeRequest, ProjectContents, RejectionReason};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Project snapshot (JSON)
    pub snapshot: PathBuf,

    /// Incoming change request (JSON)
    pub request: PathBuf,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

pub fn check(args: CheckArgs) -> Result<()> {
    let contents: ProjectContents = read_json(&args.snapshot)?;
    let request: ChangeRequest = read_json(&args.request)?;
    let rejected = rejected_targets(&request, &contents);

    if args.format == "json" {
        print_json(&rejected)?;
    } else if rejected.is_empty() {
        println!("{} {} would be accepted", "✓".green(), request.change_marker.id);
    } else {
        println!("{} {} would be rejected", "✗".red(), request.change_marker.id);
        for target in &rejected {
            let reason = match target.reason {
                RejectionReason::NewerMarker => "snapshot has a newer or equal change marker",
                RejectionReason::MissingUpdateTarget => "update target does not exist",
            };
            println!("   {} {}: {}", target.kind, target.id, reason.dimmed());
        }
    }

    if !rejected.is_empty() {
        bail!("{} target(s) rejected", rejected.len());
    }
    Ok(())
}
