//! Shared utilities for the alias-rs CLI

pub mod format;
pub mod table;

pub use format::*;
pub use table::*;
