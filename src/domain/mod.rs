//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw samples as received from the API (`TimePoint`)
//! - the chart-ready output (`ChartModel`, `ChartSeries`, `StyleHints`)
//! - the loader's observable state (`LoadState`)

pub mod types;

pub use types::*;
