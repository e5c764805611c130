use super::{print_json, read_json};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use cord_common::{expand as expand_flat, flatten_with, FlatMap, Value};
use cord_editor::flatten_options;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct FlattenArgs {
    /// Nested partial update (JSON)
    pub input: PathBuf,

    /// Extra top-level fields to keep whole
    #[arg(long = "no-expand", value_name = "FIELD")]
    pub no_expand: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ExpandArgs {
    /// Dot-notation flat map (JSON)
    pub input: PathBuf,

    /// Drop null leaves instead of keeping them
    #[arg(long)]
    pub filter_nulls: bool,
}

pub fn flatten(args: FlattenArgs, config: &Config) -> Result<()> {
    let value: Value = read_json(&args.input)?;

    let mut options = flatten_options();
    options
        .no_expand
        .extend(config.no_expand_fields.iter().chain(&args.no_expand).cloned());

    print_json(&flatten_with(&value, &options))
}

pub fn expand(args: ExpandArgs) -> Result<()> {
    let flat: FlatMap = read_json(&args.input)?;
    print_json(&expand_flat(&flat, args.filter_nulls))
}
