//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the fixed region set (`Region`) and per-region counts (`RegionCounts`)
//! - the normalized per-run snapshot (`Observation`)
//! - run configuration (`SourceKind`, `UpdateConfig`)

pub mod types;

pub use types::*;
