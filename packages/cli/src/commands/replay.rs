use super::{print_report, read_json, write_json};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use cord_editor::{
    invert_payloads, ChangeRequest, ProjectContents, RequestFactory, SystemClock, UndoStack,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Project snapshot (JSON)
    pub snapshot: PathBuf,

    /// Change requests to apply in order (JSON array)
    pub requests: PathBuf,

    /// Undo this many of the replayed requests afterwards
    #[arg(short, long, default_value = "0")]
    pub undo: usize,

    /// Write the resulting snapshot here
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// User recorded on the undo requests
    #[arg(long, default_value = "cord-cli")]
    pub user: String,
}

pub fn replay(args: ReplayArgs, config: &Config) -> Result<()> {
    let mut contents: ProjectContents = read_json(&args.snapshot)?;
    let requests: Vec<ChangeRequest> = read_json(&args.requests)?;
    let mut history = UndoStack::with_max_levels(config.undo_levels);

    println!("🔁 {} {} change request(s)", "Replaying".green().bold(), requests.len());

    let mut project_id = None;
    for request in &requests {
        let inverse = invert_payloads(request.user_payloads(), &contents);
        let report = contents.apply_change_request(request)?;
        history.record(request.user_payloads().cloned().collect(), inverse);

        println!("{} {}", "▸".cyan(), request.change_marker.id);
        print_report(&report);
        project_id = Some(request.project_id.clone());
    }

    if args.undo > 0 {
        let factory = RequestFactory::new(
            args.user.clone(),
            project_id.unwrap_or_default(),
            Arc::new(SystemClock),
        );
        for step in 0..args.undo {
            let Some(request) = history.undo(&mut contents, &factory)? else {
                println!("   {} Nothing left to undo after {} step(s)", "!".yellow(), step);
                break;
            };
            debug!(marker = %request.change_marker.id, "Undid change request");
            println!("{} undo {}", "◂".cyan(), request.change_marker.id);
        }
    }

    if let Some(output) = &args.output {
        write_json(output, &contents)?;
        println!("   Snapshot: {}", output.display());
    }

    Ok(())
}
