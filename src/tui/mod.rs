//! Ratatui-based terminal UI.
//!
//! Shows the loader's state in place of the chart while the fetch is in
//! flight or has failed, then draws the three series once data is ready.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph},
    Terminal,
};

use crate::app::DataSeriesLoader;
use crate::data::MarketChartSource;
use crate::domain::{finite_range, ChartModel, CoinId, LoadState, Rgba, ScaleMode, SeriesKind};
use crate::error::AppError;
use crate::report::{format_load_state, fmt_value, CHART_TITLE};

mod plotters_chart;

use plotters_chart::{MarketPlottersChart, PlottedSeries};

/// Start the TUI for `coin`.
pub fn run(coin: CoinId, source: Arc<dyn MarketChartSource>, scale: ScaleMode) -> Result<(), AppError> {
    let loader = DataSeriesLoader::spawn(coin, source)?;

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(loader, scale);
    let result = app.event_loop(&mut terminal);
    app.loader.cancel();
    result
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    loader: DataSeriesLoader,
    scale: ScaleMode,
    visible: [bool; 3],
    status: String,
}

impl App {
    fn new(loader: DataSeriesLoader, scale: ScaleMode) -> Self {
        let status = format!("Fetching {}...", loader.coin_id());
        Self {
            loader,
            scale,
            visible: [true; 3],
            status,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if self.loader.state().is_loading() && self.loader.poll().is_terminal() {
                self.status = match self.loader.state() {
                    LoadState::Ready(model) => format!("Loaded {} samples.", model.len()),
                    _ => "Load failed.".to_string(),
                };
                needs_redraw = true;
            }

            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))? {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the app should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('s') => {
                self.scale = self.scale.toggle();
                self.status = format!("scale: {}", self.scale.display_name());
            }
            KeyCode::Char(c @ '1'..='3') => {
                let idx = c as usize - '1' as usize;
                self.visible[idx] = !self.visible[idx];
                let kind = SeriesKind::ALL[idx];
                let onoff = if self.visible[idx] { "on" } else { "off" };
                self.status = format!("{}: {onoff}", kind.label());
            }
            _ => {}
        }
        false
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_chart(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("mc", Style::default().fg(Color::Cyan)),
            Span::raw(format!(" - {} (usd, 10d daily)", self.loader.coin_id())),
            Span::styled(
                format!(" | scale: {}", self.scale.display_name()),
                Style::default().fg(Color::Gray),
            ),
        ]));

        let mut legend = Vec::new();
        for (idx, kind) in SeriesKind::ALL.iter().enumerate() {
            let style = if self.visible[idx] {
                Style::default().fg(term_color(kind.style().stroke_color))
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let last = self
                .loader
                .state()
                .model()
                .and_then(|m| m.series(*kind))
                .and_then(|s| s.values.iter().rev().copied().find(|v| v.is_finite()))
                .map(fmt_value)
                .unwrap_or_else(|| "-".to_string());
            if idx > 0 {
                legend.push(Span::raw("  "));
            }
            legend.push(Span::styled(format!("[{}] ■ {} {last}", idx + 1, kind.label()), style));
        }
        lines.push(Line::from(legend));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut block = Block::default().borders(Borders::ALL);
        if let Some(title) = chart_title(self.loader.state()) {
            block = block.title(title);
        }
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let model = match self.loader.state() {
            LoadState::Ready(model) if !model.has_no_data() => model,
            state => {
                let color = match state {
                    LoadState::Error(_) => Color::Red,
                    _ => Color::Yellow,
                };
                let msg = Paragraph::new(format_load_state(state))
                    .style(Style::default().fg(color))
                    .block(Block::default());
                frame.render_widget(msg, inner);
                return;
            }
        };

        let Some(chart) = chart_series(model, self.scale, self.visible) else {
            let msg = Paragraph::new("All series hidden (press 1/2/3).")
                .style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        let (chart_rect, insets) = chart_layout(inner);
        let widget = MarketPlottersChart {
            series: &chart.series,
            x_bounds: chart.x_bounds,
            y_bounds: chart.y_bounds,
        };

        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, &model.labels, chart.x_bounds, chart.y_bounds, self.scale);
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "1/2/3 toggle series  s scale  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Border title for the chart pane. Loading and error messages are drawn
/// inside the pane instead, so they appear once.
fn chart_title(state: &LoadState) -> Option<&'static str> {
    state.model().map(|_| CHART_TITLE)
}

/// Series and bounds for the chart widget.
#[derive(Debug, Clone, PartialEq)]
struct ChartData {
    series: Vec<PlottedSeries>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

/// Build chart series for Plotters. `None` when nothing visible has data.
fn chart_series(model: &ChartModel, scale: ScaleMode, visible: [bool; 3]) -> Option<ChartData> {
    let mut series = Vec::new();
    let mut all_values = Vec::new();

    for s in &model.series {
        let idx = SeriesKind::ALL.iter().position(|k| *k == s.kind).unwrap_or(0);
        if !visible[idx] {
            continue;
        }
        let values = scale.apply(&s.values);
        all_values.extend(values.iter().copied());
        series.push(PlottedSeries {
            segments: segments(&values),
            stroke: s.style.stroke_color,
            fill: s.style.fill_color,
            filled: s.style.filled,
        });
    }

    let (mut y_min, mut y_max) = finite_range(all_values)?;
    if y_max <= y_min {
        y_min -= 1.0;
        y_max += 1.0;
    }
    // Filled areas read better anchored at zero when all values are positive.
    if y_min > 0.0 && scale == ScaleMode::Absolute {
        y_min = 0.0;
    }
    let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);
    let y_bounds = [y_min - pad, y_max + pad];

    let n = model.len();
    let x_bounds = if n <= 1 { [-0.5, 0.5] } else { [0.0, (n - 1) as f64] };

    Some(ChartData {
        series,
        x_bounds,
        y_bounds,
    })
}

/// Split a series at missing samples into `(index, value)` runs.
fn segments(values: &[f64]) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (k, &v) in values.iter().enumerate() {
        if v.is_finite() {
            current.push((k as f64, v));
        } else if !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn term_color(c: Rgba) -> Color {
    Color::Rgb(c.r, c.g, c.b)
}

/// Compact axis label: 1.23T, 45.6B, 789M, 12.3K.
fn fmt_compact(v: f64) -> String {
    let abs = v.abs();
    let (scaled, suffix) = if abs >= 1e12 {
        (v / 1e12, "T")
    } else if abs >= 1e9 {
        (v / 1e9, "B")
    } else if abs >= 1e6 {
        (v / 1e6, "M")
    } else if abs >= 1e3 {
        (v / 1e3, "K")
    } else {
        return format!("{v:.0}");
    };
    let digits = if scaled.abs() >= 100.0 {
        0
    } else if scaled.abs() >= 10.0 {
        1
    } else {
        2
    };
    format!("{scaled:.digits$}{suffix}")
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 8,
        right: 6,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10
        || inner.height <= insets.top + insets.bottom + 5
    {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

/// Label the x-axis with sample dates and the y-axis with compact values.
#[allow(clippy::too_many_arguments)]
fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    labels: &[String],
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    scale: ScaleMode,
) {
    let style = Style::default().fg(Color::Gray);

    // One tick per sample when they fit, otherwise evenly spaced samples.
    let n = labels.len();
    let max_ticks = (chart.width / 12).max(2) as usize;
    let step = n.div_ceil(max_ticks).max(1);
    let y = chart.y + chart.height;
    if y < inner.y + inner.height {
        for k in (0..n).step_by(step) {
            let u = if x_bounds[1] > x_bounds[0] {
                ((k as f64 - x_bounds[0]) / (x_bounds[1] - x_bounds[0])).clamp(0.0, 1.0)
            } else {
                0.5
            };
            let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
            let label = &labels[k];
            let label_len = label.chars().count() as u16;
            let start = x
                .saturating_sub(label_len / 2)
                .min((inner.x + inner.width).saturating_sub(label_len));
            frame.render_widget(
                Paragraph::new(label.as_str()).style(style),
                Rect {
                    x: start,
                    y,
                    width: label_len,
                    height: 1,
                },
            );
        }
    }

    let ticks = 5usize;
    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = fmt_compact(y_val);
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label.len() as u16);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new("date")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }

    let y_label = match scale {
        ScaleMode::Absolute => "usd",
        ScaleMode::Indexed => "idx=100",
    };
    let y_label = Paragraph::new(y_label)
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}
