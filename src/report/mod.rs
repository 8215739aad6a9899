//! Reporting utilities: plain-text rendering of load states and charts.

pub mod format;

pub use format::*;
