//! Baseline differences.
//!
//! A raw difference `metric - baseline` is hard to compare across corpora: a
//! gain of 0.1 over a 0.85 baseline is far more impressive than over a 0.3
//! baseline. The standardized difference scales the gain by the headroom in
//! its direction:
//!
//! | diff      | st_diff                    | range   |
//! |-----------|----------------------------|---------|
//! | `<= 0`    | `diff / baseline`          | [-1, 0] |
//! | `> 0`     | `diff / (1 - baseline)`    | (0, 1]  |

use anyhow::{Result, bail};

use super::baselines::BaselineTable;
use crate::table::ResultTable;
use crate::types::{DerivedRow, Metric, MetricDiff, ResultRow};

/// Slack for proportions that drift past 0 or 1 through float formatting.
const PROPORTION_EPSILON: f64 = 1e-9;

pub fn difference(metric: f64, baseline: f64) -> f64 {
    metric - baseline
}

/// Difference scaled by the available headroom. A zero denominator only
/// happens together with a zero difference and yields 0.
pub fn standardized_difference(metric: f64, baseline: f64) -> f64 {
    let diff = difference(metric, baseline);
    let headroom = if diff <= 0.0 { baseline } else { 1.0 - baseline };
    if headroom == 0.0 { 0.0 } else { diff / headroom }
}

pub fn metric_diff(metric: f64, baseline: f64) -> MetricDiff {
    MetricDiff {
        baseline,
        diff: difference(metric, baseline),
        st_diff: standardized_difference(metric, baseline),
    }
}

fn check_proportion(value: f64, what: &str, row: &ResultRow) -> Result<()> {
    if !(-PROPORTION_EPSILON..=1.0 + PROPORTION_EPSILON).contains(&value) {
        bail!("line {}: {} {} is outside [0, 1]", row.line, what, value);
    }
    Ok(())
}

fn diff_for(row: &ResultRow, metric: Metric, baselines: &BaselineTable) -> Result<MetricDiff> {
    let value = row.metric(metric);
    let baseline = baselines.resolve(row, metric)?;
    check_proportion(value, metric.label(), row)?;
    check_proportion(baseline, &format!("{} baseline", metric.label()), row)?;
    Ok(metric_diff(value.clamp(0.0, 1.0), baseline.clamp(0.0, 1.0)))
}

/// Derive the difference columns for one row. Coordinates are left at the
/// origin until a layout places the rows.
pub fn derive_row(row: &ResultRow, baselines: &BaselineTable) -> Result<DerivedRow> {
    let accuracy = diff_for(row, Metric::Accuracy, baselines)?;
    let entropy = diff_for(row, Metric::Entropy, baselines)?;
    Ok(DerivedRow::new(row.clone(), accuracy, entropy))
}

pub fn derive(table: &ResultTable, baselines: &BaselineTable) -> Result<Vec<DerivedRow>> {
    table.rows.iter().map(|row| derive_row(row, baselines)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::baselines::Baseline;
    use crate::table::parse_results;

    #[test]
    fn test_standardized_difference_below_baseline() {
        // Half way from the baseline down to zero
        let st = standardized_difference(0.15, 0.3);
        assert!((st + 0.5).abs() < 1e-12, "got {}", st);
        assert!((standardized_difference(0.0, 0.3) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_standardized_difference_above_baseline() {
        // Half way from the baseline up to one
        let st = standardized_difference(0.65, 0.3);
        assert!((st - 0.5).abs() < 1e-12, "got {}", st);
        assert!((standardized_difference(1.0, 0.3) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_standardized_difference_degenerate_baselines() {
        assert_eq!(standardized_difference(0.0, 0.0), 0.0);
        assert_eq!(standardized_difference(1.0, 1.0), 0.0);
        assert!((standardized_difference(0.5, 0.0) - 0.5).abs() < 1e-12);
        assert!((standardized_difference(0.5, 1.0) + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_equal_metric_and_baseline_is_zero() {
        let d = metric_diff(0.42, 0.42);
        assert_eq!(d.diff, 0.0);
        assert_eq!(d.st_diff, 0.0);
    }

    #[test]
    fn test_derive_uses_row_then_config_baselines() {
        let text = "Corpus\tAccuracy\tEntropy\tMajority_baseline\n\
                    manchester\t0.65\t0.35\t0.3\n\
                    providers\t0.2\t0.9\t\n";
        let table = parse_results(text).unwrap();
        let baselines: BaselineTable = [
            ("manchester".to_string(), Baseline { accuracy: 0.9, entropy: 0.7 }),
            ("providers".to_string(), Baseline { accuracy: 0.4, entropy: 0.8 }),
        ]
        .into_iter()
        .collect();

        let rows = derive(&table, &baselines).unwrap();
        assert_eq!(rows.len(), 2);

        // Row column 0.3 wins over the configured 0.9
        assert!((rows[0].accuracy.baseline - 0.3).abs() < 1e-12);
        assert!((rows[0].accuracy.st_diff - 0.5).abs() < 1e-12);
        assert!((rows[0].entropy.st_diff + 0.5).abs() < 1e-12);

        // Empty cell falls back to the corpus entry
        assert!((rows[1].accuracy.baseline - 0.4).abs() < 1e-12);
        assert!((rows[1].accuracy.st_diff + 0.5).abs() < 1e-12);
        assert!((rows[1].entropy.st_diff - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_derive_rejects_out_of_range() {
        let table = parse_results("Corpus\tAccuracy\tEntropy\nx\t1.4\t0.5\n").unwrap();
        let mut baselines = BaselineTable::new();
        baselines.insert("x", Baseline { accuracy: 0.5, entropy: 0.5 });
        let err = derive(&table, &baselines).unwrap_err().to_string();
        assert!(err.contains("outside [0, 1]"), "got: {}", err);
    }
}
