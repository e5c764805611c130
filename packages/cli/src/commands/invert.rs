use super::{print_json, read_json, write_json};
use anyhow::Result;
use clap::Args;
use cord_editor::{compute_change_request_inverse, ChangeRequest, ProjectContents, SystemClock};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct InvertArgs {
    /// Project snapshot the request was applied to (JSON)
    pub snapshot: PathBuf,

    /// Change request to invert (JSON)
    pub request: PathBuf,

    /// Write the inverse request here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn invert(args: InvertArgs) -> Result<()> {
    let contents: ProjectContents = read_json(&args.snapshot)?;
    let request: ChangeRequest = read_json(&args.request)?;

    let inverse = compute_change_request_inverse(&request, &contents, &SystemClock)?;

    match &args.output {
        Some(output) => write_json(output, &inverse),
        None => print_json(&inverse),
    }
}
