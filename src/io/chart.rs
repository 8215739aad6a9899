//! Read/write chart JSON files.
//!
//! Chart JSON is the "portable" representation of a loaded chart:
//! - the request it came from (coin, currency, window)
//! - labels, timestamps and every series with its style
//!
//! Missing samples are written as `null`.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::MarketChartQuery;
use crate::domain::{ChartModel, ChartSeries, CoinId, SeriesKind, StyleHints};
use crate::error::AppError;

/// On-disk schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartFile {
    pub tool: String,
    pub coin: String,
    pub vs_currency: String,
    pub days: u32,
    pub interval: String,
    pub generated_at: DateTime<Utc>,
    pub labels: Vec<String>,
    pub timestamps: Vec<Option<i64>>,
    pub series: Vec<ChartFileSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartFileSeries {
    pub kind: SeriesKind,
    pub label: String,
    pub values: Vec<Option<f64>>,
    pub style: StyleHints,
}

impl ChartFile {
    pub fn new(coin: &CoinId, model: &ChartModel, generated_at: DateTime<Utc>) -> Self {
        let query = MarketChartQuery::FIXED;
        Self {
            tool: "mc".to_string(),
            coin: coin.to_string(),
            vs_currency: query.vs_currency.to_string(),
            days: query.days,
            interval: query.interval.to_string(),
            generated_at,
            labels: model.labels.clone(),
            timestamps: model.timestamps.clone(),
            series: model
                .series
                .iter()
                .map(|s| ChartFileSeries {
                    kind: s.kind,
                    label: s.label.clone(),
                    values: s.values.iter().map(|v| v.is_finite().then_some(*v)).collect(),
                    style: s.style,
                })
                .collect(),
        }
    }

    /// Rebuild the chart model, checking that every series lines up with the labels.
    pub fn into_model(self) -> Result<ChartModel, AppError> {
        let n = self.labels.len();
        if self.timestamps.len() != n {
            return Err(AppError::new(
                2,
                format!("Chart JSON has {} timestamps for {n} labels.", self.timestamps.len()),
            ));
        }
        let mut series = Vec::with_capacity(self.series.len());
        for s in self.series {
            if s.values.len() != n {
                return Err(AppError::new(
                    2,
                    format!("Chart JSON series '{}' has {} values for {n} labels.", s.label, s.values.len()),
                ));
            }
            series.push(ChartSeries {
                kind: s.kind,
                label: s.label,
                values: s.values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect(),
                style: s.style,
            });
        }
        Ok(ChartModel {
            labels: self.labels,
            timestamps: self.timestamps,
            series,
        })
    }
}

/// Write a chart JSON file.
pub fn write_chart_json(path: &Path, coin: &CoinId, model: &ChartModel) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create chart JSON '{}': {e}", path.display())))?;

    let chart = ChartFile::new(coin, model, Utc::now());

    serde_json::to_writer_pretty(file, &chart)
        .map_err(|e| AppError::new(2, format!("Failed to write chart JSON: {e}")))?;

    Ok(())
}

/// Read a chart JSON file.
pub fn read_chart_json(path: &Path) -> Result<ChartFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open chart JSON '{}': {e}", path.display())))?;
    let chart: ChartFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid chart JSON: {e}")))?;
    Ok(chart)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> ChartModel {
        ChartModel {
            labels: vec!["11/14/2023".to_string(), "11/15/2023".to_string()],
            timestamps: vec![Some(1_700_000_000_000), Some(1_700_086_400_000)],
            series: vec![
                ChartSeries::new(SeriesKind::Price, vec![10.0, 20.0]),
                ChartSeries::new(SeriesKind::MarketCap, vec![100.0, f64::NAN]),
            ],
        }
    }

    #[test]
    fn missing_samples_are_written_as_null() {
        let coin = CoinId::parse("bitcoin").unwrap();
        let chart = ChartFile::new(&coin, &model(), Utc::now());
        let json = serde_json::to_value(&chart).unwrap();

        assert_eq!(json["coin"], "bitcoin");
        assert_eq!(json["days"], 10);
        assert_eq!(json["series"][0]["kind"], "price");
        assert_eq!(json["series"][1]["values"][1], serde_json::Value::Null);
        assert_eq!(json["series"][0]["style"]["stroke_color"]["r"], 75);
    }

    #[test]
    fn file_roundtrip_restores_gaps() {
        let coin = CoinId::parse("bitcoin").unwrap();
        let path = std::env::temp_dir().join(format!("mc-chart-{}.json", std::process::id()));

        write_chart_json(&path, &coin, &model()).unwrap();
        let restored = read_chart_json(&path).unwrap().into_model().unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(restored.labels, model().labels);
        assert_eq!(restored.series[0].values, vec![10.0, 20.0]);
        assert!(restored.series[1].values[1].is_nan());
    }

    #[test]
    fn misaligned_file_is_rejected() {
        let coin = CoinId::parse("bitcoin").unwrap();
        let mut chart = ChartFile::new(&coin, &model(), Utc::now());
        chart.series[0].values.pop();
        assert_eq!(chart.into_model().unwrap_err().exit_code(), 2);
    }
}
