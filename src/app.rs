//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - sets up logging and the API client
//! - runs either the TUI or the one-shot fetch

use std::sync::Arc;

use chrono::Local;
use clap::Parser;

use crate::cli::{Command, FetchArgs, PlotArgs, TuiArgs};
use crate::config::ApiConfig;
use crate::data::CoinGeckoClient;
use crate::domain::CoinId;
use crate::error::AppError;
use crate::logging::{self, LogTarget};

pub mod loader;
pub mod pipeline;

pub use loader::{CancelToken, DataSeriesLoader};

/// Entry point for the `mc` binary.
pub fn run() -> Result<(), AppError> {
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Tui(args) => handle_tui(args),
        Command::Fetch(args) => handle_fetch(args),
        Command::Plot(args) => handle_plot(args),
    }
}

fn build_client() -> Result<CoinGeckoClient, AppError> {
    let config = ApiConfig::from_env()?;
    tracing::debug!(base_url = %config.base_url, keyed = config.api_key.is_some(), "api config loaded");
    CoinGeckoClient::new(&config)
}

fn handle_tui(args: TuiArgs) -> Result<(), AppError> {
    let target = match &args.log_file {
        Some(path) => LogTarget::File(path.clone()),
        None => LogTarget::Off,
    };
    logging::init(target)?;

    let coin = CoinId::parse(&args.coin)?;
    let client = build_client()?;
    crate::tui::run(coin, Arc::new(client), args.scale)
}

fn handle_fetch(args: FetchArgs) -> Result<(), AppError> {
    logging::init(LogTarget::Stderr)?;

    let coin = CoinId::parse(&args.coin)?;
    let client = build_client()?;

    let model = pipeline::fetch_chart(&coin, &client, &Local)?;

    println!("{}", crate::report::format_chart_summary(&coin, &model));

    if !args.no_plot && !model.has_no_data() {
        let plot = crate::plot::render_ascii_chart(&model, args.scale, args.width, args.height);
        println!("{plot}");
    }

    if let Some(path) = &args.export {
        crate::io::write_chart_json(path, &coin, &model)?;
        tracing::info!(path = %path.display(), "chart exported");
    }

    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let chart = crate::io::read_chart_json(&args.chart)?;
    let coin = CoinId::parse(&chart.coin)?;
    let model = chart.into_model()?;

    println!("{}", crate::report::format_chart_summary(&coin, &model));
    if !model.has_no_data() {
        let plot = crate::plot::render_ascii_chart(&model, args.scale, args.width, args.height);
        println!("{plot}");
    }
    Ok(())
}

/// Rewrite argv so `mc` defaults to `mc tui`.
///
/// Rules:
/// - `mc`                      -> `mc tui`
/// - `mc ethereum`             -> `mc tui ethereum`
/// - `mc --scale indexed`      -> `mc tui --scale indexed`
/// - `mc --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "tui" | "fetch" | "plot");
    if is_subcommand {
        return argv;
    }

    // Anything else (a coin id or a flag) belongs to `tui`.
    argv.insert(1, "tui".to_string());
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rewrite_defaults_to_tui() {
        assert_eq!(rewrite_args(argv(&["mc"])), argv(&["mc", "tui"]));
        assert_eq!(rewrite_args(argv(&["mc", "solana"])), argv(&["mc", "tui", "solana"]));
        assert_eq!(
            rewrite_args(argv(&["mc", "--scale", "indexed"])),
            argv(&["mc", "tui", "--scale", "indexed"])
        );
    }

    #[test]
    fn rewrite_leaves_subcommands_and_help_alone() {
        assert_eq!(rewrite_args(argv(&["mc", "fetch", "eth"])), argv(&["mc", "fetch", "eth"]));
        assert_eq!(rewrite_args(argv(&["mc", "--help"])), argv(&["mc", "--help"]));
    }
}
