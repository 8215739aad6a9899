//! Formatted terminal output.
//!
//! We keep formatting code in one place so output changes are localized and
//! easy to snapshot-test.

use crate::domain::{ChartModel, CoinId, LoadState};

pub const LOADING_TEXT: &str = "Loading...";
pub const NO_DATA_TEXT: &str = "No data available";
pub const CHART_TITLE: &str = "Data Chart Of Last 10 days";

/// One-line text for a load state, as shown in place of (or above) the chart.
pub fn format_load_state(state: &LoadState) -> String {
    match state {
        LoadState::Loading => LOADING_TEXT.to_string(),
        LoadState::Error(err) => err.to_string(),
        LoadState::Ready(model) if model.has_no_data() => NO_DATA_TEXT.to_string(),
        LoadState::Ready(_) => CHART_TITLE.to_string(),
    }
}

/// Title, per-sample table, and first-to-last change for each series.
pub fn format_chart_summary(coin: &CoinId, model: &ChartModel) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== mc - {coin} (usd) ===\n"));
    out.push_str(CHART_TITLE);
    out.push('\n');

    if model.has_no_data() {
        out.push_str(NO_DATA_TEXT);
        out.push('\n');
        return out;
    }

    let first = model.labels.first().map(String::as_str).unwrap_or("-");
    let last = model.labels.last().map(String::as_str).unwrap_or("-");
    out.push_str(&format!("Samples: n={} | {first} → {last}\n\n", model.len()));

    let cells: Vec<Vec<String>> = (0..model.len())
        .map(|k| {
            let mut row = vec![model.labels[k].clone()];
            for s in &model.series {
                row.push(fmt_value(s.values.get(k).copied().unwrap_or(f64::NAN)));
            }
            row
        })
        .collect();

    let mut header = vec!["date".to_string()];
    header.extend(model.series.iter().map(|s| s.kind.short_name().to_string()));

    let widths: Vec<usize> = (0..header.len())
        .map(|col| {
            cells
                .iter()
                .map(|row| row[col].chars().count())
                .chain(std::iter::once(header[col].len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    out.push_str(&format_row(&header, &widths));
    out.push_str(&format_row(
        &widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>(),
        &widths,
    ));
    for row in &cells {
        out.push_str(&format_row(row, &widths));
    }

    let changes: Vec<String> = model
        .series
        .iter()
        .map(|s| format!("{} {}", s.kind.short_name(), fmt_change(&s.values)))
        .collect();
    out.push_str(&format!("\nChange: {}\n", changes.join(" | ")));

    out
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (idx, (cell, &width)) in cells.iter().zip(widths).enumerate() {
        if idx == 0 {
            line.push_str(&format!("{cell:<width$}"));
        } else {
            line.push_str(&format!(" | {cell:>width$}"));
        }
    }
    line.push('\n');
    line
}

/// Whole-unit value with thousands separators; `-` for missing samples.
pub fn fmt_value(v: f64) -> String {
    if !v.is_finite() {
        return "-".to_string();
    }
    let rounded = format!("{:.0}", v.abs());
    let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3);
    for (i, ch) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if v < 0.0 && rounded != "0" {
        format!("-{grouped}")
    } else {
        grouped
    }
}

fn fmt_change(values: &[f64]) -> String {
    let first = values.iter().copied().find(|v| v.is_finite());
    let last = values.iter().rev().copied().find(|v| v.is_finite());
    match (first, last) {
        (Some(a), Some(b)) if a != 0.0 => format!("{:+.2}%", (b - a) / a * 100.0),
        _ => "-".to_string(),
    }
}
