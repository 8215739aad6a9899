//! Shared "load pipeline" used by both the CLI and the TUI.
//!
//! fetch -> parse -> validate -> derive `ChartModel`
//!
//! Everything after the fetch is a pure function of the response body (and the
//! time zone used for date labels), so it can be tested without a network.

use std::fmt::Display;

use chrono::{Local, TimeZone};
use serde_json::Value;

use crate::data::{MarketChartQuery, MarketChartSource};
use crate::domain::{ChartModel, ChartSeries, CoinId, LoadState, SeriesKind, TimePoint};
use crate::error::LoadError;

/// Label format for sample dates (`M/D/YYYY`).
pub const SHORT_DATE_FORMAT: &str = "%-m/%-d/%Y";

/// Label used when a timestamp is outside the representable range.
pub const INVALID_DATE_LABEL: &str = "Invalid Date";

/// A validated `market_chart` response.
///
/// `prices` is guaranteed non-empty. Samples whose timestamp or value is not a
/// number are kept as gaps, and the secondary series may differ in length from
/// `prices` (see [`derive_chart_model`]).
#[derive(Debug, Clone, PartialEq)]
pub struct MarketChartPayload {
    pub prices: Vec<TimePoint>,
    pub market_caps: Vec<f64>,
    pub total_volumes: Vec<f64>,
}

/// Fetch, validate and derive the chart for `coin_id`, returning the terminal state.
///
/// Dates are labelled in the local time zone.
pub fn load(coin_id: &CoinId, source: &dyn MarketChartSource) -> LoadState {
    fetch_chart(coin_id, source, &Local).into()
}

/// Same as [`load`], but keeps the `Result` and lets the caller pick the time zone.
pub fn fetch_chart<Tz>(coin_id: &CoinId, source: &dyn MarketChartSource, tz: &Tz) -> Result<ChartModel, LoadError>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let result = source
        .fetch_market_chart(coin_id.as_str(), &MarketChartQuery::FIXED)
        .and_then(|body| build_chart_model(&body, tz));

    match &result {
        Ok(model) => tracing::info!(coin = %coin_id, samples = model.len(), "market chart ready"),
        Err(LoadError::Transport { detail }) => {
            tracing::warn!(coin = %coin_id, %detail, "market chart transport failure")
        }
        Err(err) => tracing::warn!(coin = %coin_id, kind = err.kind_name(), "market chart rejected"),
    }

    result
}

/// Parse and validate a body, then derive the chart model.
pub fn build_chart_model<Tz>(body: &str, tz: &Tz) -> Result<ChartModel, LoadError>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let payload = parse_market_chart(body)?;
    Ok(derive_chart_model(&payload, tz))
}

/// Validate the shape of a `market_chart` body.
///
/// - not JSON, not an object, or no (or `null`) `prices` -> `MissingField`
/// - `prices` not an array, empty, or whose first entry is not a two-element
///   array -> `MalformedShape`
/// - a secondary series that is absent or not an array, or any sample that is
///   not an array at all -> `Transport`, the same failure a broken response
///   body produces
///
/// Inside a sample, a non-numeric timestamp or value becomes a gap.
pub fn parse_market_chart(body: &str) -> Result<MarketChartPayload, LoadError> {
    let Ok(root) = serde_json::from_str::<Value>(body) else {
        return Err(LoadError::MissingField);
    };
    let Some(object) = root.as_object() else {
        return Err(LoadError::MissingField);
    };

    let prices = match object.get(SeriesKind::Price.field_name()) {
        None | Some(Value::Null) => return Err(LoadError::MissingField),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(LoadError::MalformedShape),
    };
    match prices.first() {
        Some(Value::Array(pair)) if pair.len() == 2 => {}
        _ => return Err(LoadError::MalformedShape),
    }

    let prices = prices
        .iter()
        .map(|item| parse_time_point(item, SeriesKind::Price))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MarketChartPayload {
        prices,
        market_caps: parse_secondary(object.get(SeriesKind::MarketCap.field_name()), SeriesKind::MarketCap)?,
        total_volumes: parse_secondary(object.get(SeriesKind::TotalVolume.field_name()), SeriesKind::TotalVolume)?,
    })
}

/// Derive the rendering-ready chart. Pure: equal inputs give equal outputs.
///
/// Secondary series are aligned to the price samples by index: extra samples
/// are dropped and missing ones become `NaN`.
pub fn derive_chart_model<Tz>(payload: &MarketChartPayload, tz: &Tz) -> ChartModel
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let n = payload.prices.len();
    let timestamps: Vec<Option<i64>> = payload.prices.iter().map(|p| p.timestamp_ms).collect();
    let labels = timestamps
        .iter()
        .map(|ts| match ts {
            Some(ts) => format_date_label(*ts, tz),
            None => INVALID_DATE_LABEL.to_string(),
        })
        .collect();

    let prices = payload.prices.iter().map(|p| p.value).collect();
    let market_caps = align_to(&payload.market_caps, n, SeriesKind::MarketCap);
    let total_volumes = align_to(&payload.total_volumes, n, SeriesKind::TotalVolume);

    ChartModel {
        labels,
        timestamps,
        series: vec![
            ChartSeries::new(SeriesKind::Price, prices),
            ChartSeries::new(SeriesKind::MarketCap, market_caps),
            ChartSeries::new(SeriesKind::TotalVolume, total_volumes),
        ],
    }
}

/// Short calendar date for a millisecond timestamp in `tz`.
pub fn format_date_label<Tz>(timestamp_ms: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match tz.timestamp_millis_opt(timestamp_ms).earliest() {
        Some(dt) => dt.format(SHORT_DATE_FORMAT).to_string(),
        None => INVALID_DATE_LABEL.to_string(),
    }
}

fn parse_time_point(item: &Value, kind: SeriesKind) -> Result<TimePoint, LoadError> {
    let pair = sample(item, kind)?;
    let timestamp_ms = pair.first().and_then(|ts| match ts.as_i64() {
        Some(ts) => Some(ts),
        None => ts.as_f64().filter(|ts| ts.is_finite()).map(|ts| ts as i64),
    });
    let value = pair.get(1).and_then(Value::as_f64).unwrap_or(f64::NAN);
    Ok(TimePoint { timestamp_ms, value })
}

fn parse_secondary(field: Option<&Value>, kind: SeriesKind) -> Result<Vec<f64>, LoadError> {
    let Some(Value::Array(items)) = field else {
        return Err(LoadError::transport(format!("`{}` is missing or not an array", kind.field_name())));
    };
    items
        .iter()
        .map(|item| -> Result<f64, LoadError> {
            let pair = sample(item, kind)?;
            Ok(pair.get(1).and_then(Value::as_f64).unwrap_or(f64::NAN))
        })
        .collect()
}

fn sample(item: &Value, kind: SeriesKind) -> Result<&Vec<Value>, LoadError> {
    item.as_array()
        .ok_or_else(|| LoadError::transport(format!("`{}` holds a non-array sample", kind.field_name())))
}

fn align_to(values: &[f64], n: usize, kind: SeriesKind) -> Vec<f64> {
    if values.len() != n {
        tracing::warn!(
            series = kind.field_name(),
            got = values.len(),
            expected = n,
            "series length differs from prices; aligning by index"
        );
    }
    let mut out: Vec<f64> = values.iter().copied().take(n).collect();
    out.resize(n, f64::NAN);
    out
}
