//! # Cord Evaluator
//!
//! Renderer-side consumers of the document model. Computes the properties a
//! symbol instance actually renders from its shared definition and the
//! instance's sparse overrides.

pub mod override_merge;

pub use override_merge::{
    merge_overrides, override_merge, reconcile_display, MergedProperties, OverrideMerger,
    SymbolDefinition, SymbolInstance,
};
