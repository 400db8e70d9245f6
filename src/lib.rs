//! `covid-at-timeseries` library crate.
//!
//! The binary (`covid-at`) is a thin wrapper around this library so that:
//!
//! - the merge logic is testable without spawning processes or touching the network
//! - source adapters can be swapped as upstream formats change

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod merge;
pub mod report;
