//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Each series is drawn as a line of its marker (`P`, `M`, `V`). Series are
//! drawn in chart order and never overwrite each other, so price wins where
//! lines cross. Missing samples break the line.

use crate::domain::{ChartModel, ScaleMode, finite_range};

/// Render all series of `model` on one grid.
pub fn render_ascii_chart(model: &ChartModel, scale: ScaleMode, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let scaled: Vec<(char, Vec<f64>)> = model
        .series
        .iter()
        .map(|s| (s.kind.marker(), scale.apply(&s.values)))
        .collect();

    let (y_min, y_max) = y_range(&scaled);
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    for (marker, values) in &scaled {
        draw_series(&mut grid, values, *marker, y_min, y_max);
    }

    let first = model.labels.first().map(String::as_str).unwrap_or("-");
    let last = model.labels.last().map(String::as_str).unwrap_or("-");

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {first} → {last} | y=[{y_min:.2}, {y_max:.2}] ({})\n",
        scale.display_name()
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    let legend: Vec<String> = model
        .series
        .iter()
        .map(|s| format!("{} {}", s.kind.marker(), s.label))
        .collect();
    out.push_str(&format!("Legend: {}\n", legend.join(" | ")));

    out
}

fn y_range(series: &[(char, Vec<f64>)]) -> (f64, f64) {
    match finite_range(series.iter().flat_map(|(_, v)| v.iter().copied())) {
        Some((min, max)) if max > min => (min, max),
        Some((v, _)) => (v - 1.0, v + 1.0),
        None => (0.0, 1.0),
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(k: usize, n: usize, width: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    let u = k as f64 / (n as f64 - 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_series(grid: &mut [Vec<char>], values: &[f64], ch: char, y_min: f64, y_max: f64) {
    let height = grid.len();
    let width = grid[0].len();
    let n = values.len();

    let mut prev = None;
    for (k, &v) in values.iter().enumerate() {
        if !v.is_finite() {
            prev = None;
            continue;
        }
        let x = map_x(k, n, width);
        let y = map_y(v, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, y, ch),
            None => {
                if grid[y][x] == ' ' {
                    grid[y][x] = ch;
                }
            }
        }
        prev = Some((x, y));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChartSeries, SeriesKind};

    fn model(price: Vec<f64>, caps: Vec<f64>, volumes: Vec<f64>) -> ChartModel {
        let n = price.len();
        ChartModel {
            labels: (0..n).map(|k| format!("11/{}/2023", 14 + k)).collect(),
            timestamps: (0..n as i64).map(|k| Some(k * 86_400_000)).collect(),
            series: vec![
                ChartSeries::new(SeriesKind::Price, price),
                ChartSeries::new(SeriesKind::MarketCap, caps),
                ChartSeries::new(SeriesKind::TotalVolume, volumes),
            ],
        }
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let m = model(vec![10.0, 20.0], vec![100.0, 200.0], vec![1000.0, 500.0]);

        let txt = render_ascii_chart(&m, ScaleMode::Indexed, 10, 5);
        let expected = concat!(
            "Plot: 11/14/2023 → 11/15/2023 | y=[42.50, 207.50] (indexed)\n",
            "        PP\n",
            "     PPP  \n",
            "  PPP     \n",
            "PPVVV     \n",
            "     VVVVV\n",
            "Legend: P Price Over Time | M Market Cap Over Time | V Total Volume Over Time\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn gaps_break_lines_and_single_samples_plot() {
        let m = model(
            vec![1.0, f64::NAN, 1.0],
            vec![f64::NAN; 3],
            vec![f64::NAN; 3],
        );
        let txt = render_ascii_chart(&m, ScaleMode::Absolute, 10, 5);
        let rows: Vec<&str> = txt.lines().skip(1).take(5).collect();
        // Flat series sits mid-grid; only the two endpoints are drawn.
        assert_eq!(rows[2], "P        P");
        assert!(rows.iter().enumerate().all(|(i, r)| i == 2 || r.trim().is_empty()));
    }

    #[test]
    fn one_sample_lands_in_first_column() {
        let m = model(vec![5.0], vec![6.0], vec![7.0]);
        let txt = render_ascii_chart(&m, ScaleMode::Absolute, 10, 5);
        assert!(txt.lines().skip(1).take(5).any(|r| r.starts_with('P')));
    }
}
