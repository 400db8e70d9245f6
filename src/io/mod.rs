//! Input/output helpers.
//!
//! - the persisted CSV time series (`series`)
//! - observation JSON export (`observation`)

pub mod observation;
pub mod series;

pub use observation::*;
pub use series::*;
