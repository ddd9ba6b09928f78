//! Baseline comparison of grid results.
//!
//! 1. Baselines: per-row columns or per-corpus config entries
//! 2. Metrics: raw and standardized differences against those baselines
//! 3. Filter: threshold predicates selecting the interesting configurations
//! 4. Summary: best configuration and factor importance

pub mod baselines;
pub mod filter;
pub mod metrics;
pub mod summary;

pub use baselines::{
    Baseline, BaselineTable, compute_baselines, entropy_baseline, majority_baseline,
    read_test_items, tag_distribution,
};
pub use filter::{FilterError, Predicate, filter_rows, selection_mask};
pub use metrics::{derive, difference, metric_diff, standardized_difference};
pub use summary::{GridSummary, format_summary};
