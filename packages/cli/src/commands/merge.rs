use super::{print_json, read_json};
use anyhow::Result;
use clap::Args;
use cord_evaluator::{merge_overrides as merge, SymbolDefinition, SymbolInstance};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Symbol instance with its overrides (JSON)
    pub instance: PathBuf,

    /// Shared symbol definition (JSON)
    pub definition: PathBuf,
}

pub fn merge_overrides(args: MergeArgs) -> Result<()> {
    let instance: SymbolInstance = read_json(&args.instance)?;
    let definition: SymbolDefinition = read_json(&args.definition)?;

    let merged = merge(&instance, &definition)?;
    print_json(&merged)
}
