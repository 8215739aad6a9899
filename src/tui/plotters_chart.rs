//! Plotters-powered market chart widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.
//! Tick labels are drawn by the caller with plain Ratatui paragraphs, which
//! read better at terminal resolution than Plotters' own text.

use plotters::prelude::*;
use plotters::style::Color as _;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

use crate::domain::Rgba;

/// One series ready for drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct PlottedSeries {
    /// Contiguous runs of `(sample index, value)`; gaps split runs.
    pub segments: Vec<Vec<(f64, f64)>>,
    pub stroke: Rgba,
    pub fill: Rgba,
    pub filled: bool,
}

/// A lightweight, render-only chart description.
///
/// All series and bounds are computed outside the render call.
pub struct MarketPlottersChart<'a> {
    pub series: &'a [PlottedSeries],
    /// X bounds (sample index).
    pub x_bounds: [f64; 2],
    /// Y bounds (units depend on the scale mode).
    pub y_bounds: [f64; 2],
}

impl<'a> Widget for MarketPlottersChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // When the available area is too small, Plotters may fail to build a chart.
        // In that case, we render a small hint rather than panicking.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let x0 = self.x_bounds[0];
        let x1 = self.x_bounds[1];
        let y0 = self.y_bounds[0];
        let y1 = self.y_bounds[1];

        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_labels(0)
                .y_labels(0)
                .axis_style(&WHITE)
                .draw()?;

            // Fills first so every stroke stays visible on top.
            for s in self.series.iter().filter(|s| s.filled) {
                let fill = to_rgb(s.fill).mix(s.fill.alpha);
                for seg in &s.segments {
                    chart.draw_series(AreaSeries::new(seg.iter().copied(), y0, fill.filled()))?;
                }
            }

            for s in self.series {
                let stroke = to_rgb(s.stroke);
                for seg in &s.segments {
                    if seg.len() == 1 {
                        chart.draw_series(seg.iter().map(|&(x, y)| Pixel::new((x, y), stroke)))?;
                    } else {
                        chart.draw_series(LineSeries::new(seg.iter().copied(), &stroke))?;
                    }
                }
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}

fn to_rgb(c: Rgba) -> RGBColor {
    RGBColor(c.r, c.g, c.b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SeriesKind;

    #[test]
    fn filled_series_render_into_buffer() {
        let style = SeriesKind::Price.style();
        let series = [PlottedSeries {
            segments: vec![vec![(0.0, 1.0), (1.0, 3.0), (2.0, 2.0)]],
            stroke: style.stroke_color,
            fill: style.fill_color,
            filled: true,
        }];
        let area = Rect::new(0, 0, 40, 12);
        let mut buf = Buffer::empty(area);

        MarketPlottersChart {
            series: &series,
            x_bounds: [0.0, 2.0],
            y_bounds: [0.0, 4.0],
        }
        .render(area, &mut buf);

        let drawn = buf.content().iter().filter(|cell| cell.symbol() != " ").count();
        assert!(drawn > 0);
    }
}
