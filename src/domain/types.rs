//! Shared domain types.
//!
//! The chart types are serializable so a loaded chart can be exported to JSON
//! and inspected outside the terminal.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, LoadError};

/// A CoinGecko coin id such as `bitcoin`. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CoinId(String);

impl CoinId {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::new(2, "Coin id must not be empty."));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CoinId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single `(timestamp, value)` sample as received from the API.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimePoint {
    /// Unix timestamp in milliseconds; `None` when the API sent something else.
    pub timestamp_ms: Option<i64>,
    /// `NaN` when the API sent something other than a number.
    pub value: f64,
}

impl TimePoint {
    pub fn new(timestamp_ms: i64, value: f64) -> Self {
        Self {
            timestamp_ms: Some(timestamp_ms),
            value,
        }
    }
}

/// The three series of a market chart, in chart order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    Price,
    MarketCap,
    TotalVolume,
}

impl SeriesKind {
    pub const ALL: [SeriesKind; 3] = [
        SeriesKind::Price,
        SeriesKind::MarketCap,
        SeriesKind::TotalVolume,
    ];

    /// Legend label.
    pub fn label(self) -> &'static str {
        match self {
            SeriesKind::Price => "Price Over Time",
            SeriesKind::MarketCap => "Market Cap Over Time",
            SeriesKind::TotalVolume => "Total Volume Over Time",
        }
    }

    /// JSON field holding this series in a `market_chart` response.
    pub fn field_name(self) -> &'static str {
        match self {
            SeriesKind::Price => "prices",
            SeriesKind::MarketCap => "market_caps",
            SeriesKind::TotalVolume => "total_volumes",
        }
    }

    /// Single-character marker used by text plots.
    pub fn marker(self) -> char {
        match self {
            SeriesKind::Price => 'P',
            SeriesKind::MarketCap => 'M',
            SeriesKind::TotalVolume => 'V',
        }
    }

    /// Compact column header for tables.
    pub fn short_name(self) -> &'static str {
        match self {
            SeriesKind::Price => "price",
            SeriesKind::MarketCap => "market_cap",
            SeriesKind::TotalVolume => "volume",
        }
    }

    pub fn style(self) -> StyleHints {
        let (r, g, b) = match self {
            SeriesKind::Price => (75, 192, 192),
            SeriesKind::MarketCap => (153, 102, 255),
            SeriesKind::TotalVolume => (255, 159, 64),
        };
        StyleHints {
            stroke_color: Rgba::new(r, g, b, 1.0),
            fill_color: Rgba::new(r, g, b, 0.2),
            filled: true,
        }
    }
}

/// An sRGB color with alpha in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub alpha: f64,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, alpha: f64) -> Self {
        Self { r, g, b, alpha }
    }

    /// CSS functional notation, e.g. `rgba(75,192,192,0.2)`.
    pub fn css(&self) -> String {
        format!("rgba({},{},{},{})", self.r, self.g, self.b, self.alpha)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StyleHints {
    pub stroke_color: Rgba,
    pub fill_color: Rgba,
    pub filled: bool,
}

/// One plotted series. `values[k]` lines up with `ChartModel::labels[k]`.
///
/// A `NaN` value marks a sample the API did not provide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub kind: SeriesKind,
    pub label: String,
    pub values: Vec<f64>,
    pub style: StyleHints,
}

impl ChartSeries {
    pub fn new(kind: SeriesKind, values: Vec<f64>) -> Self {
        Self {
            kind,
            label: kind.label().to_string(),
            values,
            style: kind.style(),
        }
    }

    /// Min/max over finite values.
    pub fn finite_range(&self) -> Option<(f64, f64)> {
        finite_range(self.values.iter().copied())
    }
}

/// Rendering-ready chart.
///
/// Invariant: every series has exactly `labels.len()` values, and
/// `timestamps.len() == labels.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartModel {
    pub labels: Vec<String>,
    /// Source timestamps (ms) behind each label; `None` where it was unreadable.
    pub timestamps: Vec<Option<i64>>,
    pub series: Vec<ChartSeries>,
}

impl ChartModel {
    /// Number of samples per series.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// `true` when there is nothing to draw.
    pub fn has_no_data(&self) -> bool {
        self.series.is_empty() || self.is_empty()
    }

    pub fn series(&self, kind: SeriesKind) -> Option<&ChartSeries> {
        self.series.iter().find(|s| s.kind == kind)
    }
}

/// How series values are mapped onto the y-axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    /// Raw values on one shared axis.
    #[default]
    Absolute,
    /// Each series rebased to 100 at its first finite, non-zero sample.
    Indexed,
}

impl ScaleMode {
    pub fn toggle(self) -> Self {
        match self {
            ScaleMode::Absolute => ScaleMode::Indexed,
            ScaleMode::Indexed => ScaleMode::Absolute,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ScaleMode::Absolute => "absolute",
            ScaleMode::Indexed => "indexed",
        }
    }

    /// Map series values into this scale. Missing samples stay `NaN`.
    pub fn apply(self, values: &[f64]) -> Vec<f64> {
        match self {
            ScaleMode::Absolute => values.to_vec(),
            ScaleMode::Indexed => {
                let Some(base) = values.iter().copied().find(|v| v.is_finite() && *v != 0.0) else {
                    return vec![f64::NAN; values.len()];
                };
                values.iter().map(|v| v / base * 100.0).collect()
            }
        }
    }
}

/// What the renderer sees. Exactly one case is active at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Loading,
    Error(LoadError),
    Ready(ChartModel),
}

impl LoadState {
    /// `Error` and `Ready` never change once reached.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoadState::Loading)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    pub fn model(&self) -> Option<&ChartModel> {
        match self {
            LoadState::Ready(model) => Some(model),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&LoadError> {
        match self {
            LoadState::Error(err) => Some(err),
            _ => None,
        }
    }
}

impl From<Result<ChartModel, LoadError>> for LoadState {
    fn from(result: Result<ChartModel, LoadError>) -> Self {
        match result {
            Ok(model) => LoadState::Ready(model),
            Err(err) => LoadState::Error(err),
        }
    }
}

/// Min/max over the finite values of an iterator.
pub fn finite_range(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values {
        if v.is_finite() {
            min = min.min(v);
            max = max.max(v);
        }
    }
    if min.is_finite() && max.is_finite() {
        Some((min, max))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coin_id_rejects_blank_input() {
        assert_eq!(CoinId::parse("  bitcoin ").unwrap().as_str(), "bitcoin");
        assert_eq!(CoinId::parse("   ").unwrap_err().exit_code(), 2);
    }

    #[test]
    fn series_styles_match_palette() {
        let price = SeriesKind::Price.style();
        assert_eq!(price.stroke_color.css(), "rgba(75,192,192,1)");
        assert_eq!(price.fill_color.css(), "rgba(75,192,192,0.2)");
        assert!(price.filled);

        assert_eq!(SeriesKind::MarketCap.style().stroke_color.css(), "rgba(153,102,255,1)");
        assert_eq!(SeriesKind::TotalVolume.style().fill_color.css(), "rgba(255,159,64,0.2)");
    }

    #[test]
    fn indexed_scale_rebases_to_first_finite_sample() {
        let out = ScaleMode::Indexed.apply(&[f64::NAN, 50.0, 75.0]);
        assert!(out[0].is_nan());
        assert_eq!(out[1], 100.0);
        assert_eq!(out[2], 150.0);
    }

    #[test]
    fn indexed_scale_without_base_is_all_missing() {
        let out = ScaleMode::Indexed.apply(&[0.0, f64::NAN]);
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn finite_range_skips_nan() {
        assert_eq!(finite_range([3.0, f64::NAN, -1.0]), Some((-1.0, 3.0)));
        assert_eq!(finite_range([f64::NAN]), None);
    }

    #[test]
    fn load_state_terminal_flags() {
        assert!(!LoadState::Loading.is_terminal());
        assert!(LoadState::Error(LoadError::MissingField).is_terminal());
        let empty = ChartModel {
            labels: vec![],
            timestamps: vec![],
            series: vec![],
        };
        assert!(LoadState::Ready(empty).is_terminal());
    }
}
