//! posgrid - baseline comparison and grid plots for PoS-tagging experiments
//!
//! A grid search over cue types, evaluation methods, vowel/stress encodings
//! and hyperparameters yields one accuracy/entropy pair per configuration.
//! Raw scores are hard to compare across corpora with different tag
//! distributions, so every score is expressed as a standardized difference
//! from that corpus's chance baseline.
//!
//! # Architecture
//!
//! ```text
//! TSV table → Baselines → Derived metrics → Layout (X/Y) → Filter → Plot / Summary / Export
//!     ↓           ↓              ↓               ↓            ↓            ↓
//!   reader    row columns    diff, St.diff    factor       predicate    plotters
//!             or config                       offsets      language     + owo-colors
//! ```

pub mod analysis;
pub mod config;
pub mod layout;
pub mod rendering;
pub mod table;
pub mod types;

pub use analysis::{Baseline, BaselineTable, GridSummary, Predicate, derive, filter_rows};
pub use config::Config;
pub use layout::{Axis, FittedLayout, Layout};
pub use rendering::{PlotOptions, render_grid};
pub use table::{ResultTable, read_results};
pub use types::{DerivedRow, Factor, Metric, MetricDiff, NumericColumn, ResultRow};
