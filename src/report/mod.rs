//! Day-over-day delta summary for the terminal.
//!
//! Formatting is kept apart from the merge so output changes stay local and the
//! merge stays free of presentation concerns.

pub mod format;

pub use format::*;
