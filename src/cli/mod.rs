//! Command-line parsing for the market chart viewer.
//!
//! The goal of this module is to keep **argument parsing** separate from
//! fetching and rendering.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::ScaleMode;

/// Coin shown when none is given.
pub const DEFAULT_COIN: &str = "bitcoin";

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "mc", version, about = "10-day price / market cap / volume charts from CoinGecko")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch the interactive chart.
    Tui(TuiArgs),
    /// Fetch once, print a table and an ASCII plot, and optionally export JSON.
    Fetch(FetchArgs),
    /// Plot a previously exported chart JSON.
    Plot(PlotArgs),
}

#[derive(Debug, Args, Clone)]
pub struct TuiArgs {
    /// CoinGecko coin id (e.g. bitcoin, ethereum).
    #[arg(default_value = DEFAULT_COIN)]
    pub coin: String,

    /// Write logs to this file (the TUI never logs to the terminal).
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Initial y scale.
    #[arg(long, value_enum, default_value_t = ScaleMode::Absolute)]
    pub scale: ScaleMode,
}

#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    /// CoinGecko coin id (e.g. bitcoin, ethereum).
    #[arg(default_value = DEFAULT_COIN)]
    pub coin: String,

    /// Skip the ASCII plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Y scale for the plot.
    #[arg(long, value_enum, default_value_t = ScaleMode::Indexed)]
    pub scale: ScaleMode,

    /// Export the chart model to JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,
}

/// Options for plotting a saved chart.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Chart JSON file produced by `mc fetch --export`.
    #[arg(long, value_name = "JSON")]
    pub chart: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Y scale for the plot.
    #[arg(long, value_enum, default_value_t = ScaleMode::Indexed)]
    pub scale: ScaleMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_flags_parse() {
        let cli = Cli::parse_from(["mc", "fetch", "ethereum", "--no-plot", "--scale", "absolute"]);
        let Command::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.coin, "ethereum");
        assert!(args.no_plot);
        assert_eq!(args.scale, ScaleMode::Absolute);
        assert_eq!(args.export, None);
    }

    #[test]
    fn plot_requires_chart_path() {
        assert!(Cli::try_parse_from(["mc", "plot"]).is_err());
        let cli = Cli::parse_from(["mc", "plot", "--chart", "btc.json", "--width", "40"]);
        let Command::Plot(args) = cli.command else {
            panic!("expected plot");
        };
        assert_eq!(args.chart, PathBuf::from("btc.json"));
        assert_eq!(args.width, 40);
    }

    #[test]
    fn tui_defaults_to_bitcoin() {
        let cli = Cli::parse_from(["mc", "tui"]);
        let Command::Tui(args) = cli.command else {
            panic!("expected tui");
        };
        assert_eq!(args.coin, DEFAULT_COIN);
        assert_eq!(args.scale, ScaleMode::Absolute);
    }
}
