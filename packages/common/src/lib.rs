//! # Cord Common
//!
//! Shared data model for the Cord change engine: the dynamic [`Value`] type
//! used for documents and partial updates, and the dot-notation codec that
//! every update path goes through.

pub mod dot_notation;
pub mod error;
pub mod result;
pub mod value;

pub use dot_notation::*;
pub use error::*;
pub use result::*;
pub use value::*;
