//! `market-chart` library crate.
//!
//! The binary (`mc`) is a thin wrapper around this library so that:
//!
//! - fetching, validation and chart derivation are testable without a network
//! - the TUI and the one-shot `fetch` command share one pipeline

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod plot;
pub mod report;
pub mod tui;
