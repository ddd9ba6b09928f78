//! Grid scatterplots.
//!
//! One row of panels per corpus, one column per metric (accuracy, entropy).
//! Inside a panel each configuration sits at its layout coordinates:
//! - **color**: diverging palette on the metric's standardized difference
//! - **size**: grows with |standardized difference|
//! - **alpha**: opaque when the row passes the active filter, faded otherwise
//!
//! Rendering needs the `plotters` feature (on by default).

#[cfg(feature = "plotters")]
use plotters::coord::Shift;
#[cfg(feature = "plotters")]
use plotters::prelude::*;
use serde::Deserialize;
use std::path::Path;

#[cfg(feature = "plotters")]
use super::colors::diverging;
use crate::layout::FittedLayout;
#[cfg(feature = "plotters")]
use crate::layout::Axis;
use crate::types::{DerivedRow, Factor};
#[cfg(feature = "plotters")]
use crate::types::Metric;

/// Figure settings, `[plot]` in posgrid.toml.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct PlotOptions {
    pub width: u32,
    pub height: u32,
    /// Alpha for rows rejected by the filter
    pub faded_alpha: f64,
    pub min_point_size: u32,
    pub max_point_size: u32,
    pub title: Option<String>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            width: 1600,
            height: 1200,
            faded_alpha: 0.15,
            min_point_size: 2,
            max_point_size: 9,
            title: None,
        }
    }
}

impl PlotOptions {
    /// Radius for a standardized difference, linear in its magnitude.
    pub fn point_size(&self, st_diff: f64) -> u32 {
        let t = st_diff.abs().clamp(0.0, 1.0);
        let min = self.min_point_size.min(self.max_point_size) as f64;
        let max = self.max_point_size.max(self.min_point_size) as f64;
        (min + t * (max - min)).round() as u32
    }

    pub fn alpha(&self, selected: bool) -> f64 {
        if selected { 1.0 } else { self.faded_alpha.clamp(0.0, 1.0) }
    }
}

/// Distinct corpora in first-seen order.
pub fn corpora(rows: &[DerivedRow]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for row in rows {
        let corpus = row.level(Factor::Corpus);
        if !seen.iter().any(|c| c == corpus) {
            seen.push(corpus.to_string());
        }
    }
    seen
}

/// Padded axis range around the layout extent.
pub fn padded_range((lo, hi): (f64, f64)) -> std::ops::Range<f64> {
    let span = hi - lo;
    let pad = if span > 0.0 { span * 0.05 } else { 1.0 };
    (lo - pad)..(hi + pad)
}

/// Render the grid figure to `path` (`.svg` for vector output, PNG otherwise).
#[cfg(feature = "plotters")]
pub fn render_grid(
    rows: &[DerivedRow],
    mask: &[bool],
    layout: &FittedLayout,
    options: &PlotOptions,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    if rows.len() != mask.len() {
        return Err(format!("selection mask has {} entries for {} rows", mask.len(), rows.len()).into());
    }
    if rows.is_empty() {
        return Err("nothing to plot: the table has no rows".into());
    }

    let size = (options.width, options.height);
    let is_svg = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("svg"))
        .unwrap_or(false);

    if is_svg {
        let root = SVGBackend::new(path, size).into_drawing_area();
        draw_figure(&root, rows, mask, layout, options)?;
        root.present()?;
    } else {
        let root = BitMapBackend::new(path, size).into_drawing_area();
        draw_figure(&root, rows, mask, layout, options)?;
        root.present()?;
    }

    Ok(())
}

#[cfg(feature = "plotters")]
fn draw_figure<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    rows: &[DerivedRow],
    mask: &[bool],
    layout: &FittedLayout,
    options: &PlotOptions,
) -> Result<(), Box<dyn std::error::Error>>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let title = options
        .title
        .clone()
        .unwrap_or_else(|| format!("Standardized difference from baseline ({} configurations)", rows.len()));
    let body = root.titled(&title, ("sans-serif", 26))?;

    let corpora = corpora(rows);
    let panels = body.split_evenly((corpora.len(), Metric::ALL.len()));

    let x_range = padded_range(layout.extent(Axis::X));
    let y_range = padded_range(layout.extent(Axis::Y));

    for (ci, corpus) in corpora.iter().enumerate() {
        for (mi, metric) in Metric::ALL.iter().enumerate() {
            let area = &panels[ci * Metric::ALL.len() + mi];

            let mut chart = ChartBuilder::on(area)
                .caption(format!("{} · {}_St.diff", corpus, metric.prefix()), ("sans-serif", 18))
                .margin(10)
                .x_label_area_size(35)
                .y_label_area_size(50)
                .build_cartesian_2d(x_range.clone(), y_range.clone())?;

            chart
                .configure_mesh()
                .disable_mesh()
                .x_labels(0)
                .y_labels(0)
                .x_desc(layout.description(Axis::X))
                .y_desc(layout.description(Axis::Y))
                .draw()?;

            // Block labels for the coarsest factor on each axis
            let label_style = ("sans-serif", 12).into_font().color(&RGBColor(90, 90, 90));
            chart.draw_series(layout.tick_labels(Axis::X).into_iter().map(|(x, label)| {
                Text::new(label, (x, y_range.start), label_style.clone())
            }))?;
            chart.draw_series(layout.tick_labels(Axis::Y).into_iter().map(|(y, label)| {
                Text::new(label, (x_range.start, y), label_style.clone())
            }))?;

            // Faded points first so selected ones stay on top
            let mut points: Vec<(&DerivedRow, bool)> = rows
                .iter()
                .zip(mask.iter().copied())
                .filter(|(row, _)| row.level(Factor::Corpus) == corpus.as_str())
                .collect();
            points.sort_by_key(|(_, selected)| *selected);

            chart.draw_series(points.iter().map(|(row, selected)| {
                let st = row.diff(*metric).st_diff;
                let (r, g, b) = diverging(st);
                let alpha = options.alpha(*selected);
                Circle::new(
                    (row.x, row.y),
                    options.point_size(st),
                    RGBColor(r, g, b).mix(alpha).filled(),
                )
            }))?;

            // Thin outline keeps near-zero (white) points visible
            chart.draw_series(points.iter().filter(|(_, selected)| *selected).map(|(row, _)| {
                let st = row.diff(*metric).st_diff;
                Circle::new(
                    (row.x, row.y),
                    options.point_size(st),
                    RGBColor(60, 60, 60).mix(0.6).stroke_width(1),
                )
            }))?;
        }
    }

    Ok(())
}

/// Stub when plotters feature is disabled.
#[cfg(not(feature = "plotters"))]
pub fn render_grid(
    _rows: &[DerivedRow],
    _mask: &[bool],
    _layout: &FittedLayout,
    _options: &PlotOptions,
    _path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    Err("Plotting requires --features plotters".into())
}
