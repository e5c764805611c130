pub mod apply;
pub mod check;
pub mod codec;
pub mod invert;
pub mod merge;
pub mod replay;

pub use apply::{apply, ApplyArgs};
pub use check::{check, CheckArgs};
pub use codec::{expand, flatten, ExpandArgs, FlattenArgs};
pub use invert::{invert, InvertArgs};
pub use merge::{merge_overrides, MergeArgs};
pub use replay::{replay, ReplayArgs};

use anyhow::{Context, Result};
use colored::Colorize;
use cord_editor::ChangeReport;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Read and parse a JSON file
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Cannot write {}", path.display()))
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Text form of a reconciler report
pub(crate) fn print_report(report: &ChangeReport) {
    if report.is_empty() {
        println!("   {} No documents changed", "✓".green());
        return;
    }

    for (kind, section) in &report.sections {
        if section.is_empty() {
            continue;
        }
        println!("   {}", kind.to_string().bold());
        for id in &section.created {
            println!("     {} {}", "+".green(), id);
        }
        for id in &section.updated {
            println!("     {} {}", "~".yellow(), id);
        }
        for id in &section.deleted {
            println!("     {} {}", "-".red(), id);
        }
    }
}
