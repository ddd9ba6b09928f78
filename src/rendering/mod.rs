//! Output rendering - from derived rows to figures and terminal reports.
//!
//! - Plots: multi-panel scatterplots of the grid (plotters, feature-gated)
//! - Report: aligned row listing for `--list`

pub mod colors;
pub mod plots;
pub mod report;

pub use colors::{Colorizer, diverging};
pub use plots::{PlotOptions, render_grid};
pub use report::format_rows;
