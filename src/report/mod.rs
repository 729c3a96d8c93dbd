//! Output tables and summaries.

pub mod generator;
pub mod pivot;

pub use generator::*;
pub use pivot::{Cell, PivotTable};
