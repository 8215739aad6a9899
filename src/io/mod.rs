//! Input/output helpers.
//!
//! - chart JSON read/write (`chart`)

pub mod chart;

pub use chart::*;
