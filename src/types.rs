//! Core types for posgrid.
//!
//! A results table is a grid: every row is one parametrization of the tagging
//! experiment (corpus, cue type, evaluation method, vowel/stress encoding, K,
//! flush, ...) together with the accuracy and entropy it achieved. Rows are
//! loaded as [`ResultRow`], then enriched into [`DerivedRow`] with baseline
//! differences and plot coordinates.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Number of grid factors tracked per row.
pub const FACTOR_COUNT: usize = 12;

/// A categorical dimension of the experiment grid.
///
/// Order matters: it is the column order used when a report lists factor
/// levels, and the append order for layout factors added from config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Factor {
    TestSet,
    Corpus,
    Boundaries,
    Cues,
    Outcomes,
    Stress,
    Vowels,
    Method,
    Evaluation,
    K,
    Flush,
    Time,
}

impl Factor {
    pub const ALL: [Factor; FACTOR_COUNT] = [
        Factor::TestSet,
        Factor::Corpus,
        Factor::Boundaries,
        Factor::Cues,
        Factor::Outcomes,
        Factor::Stress,
        Factor::Vowels,
        Factor::Method,
        Factor::Evaluation,
        Factor::K,
        Factor::Flush,
        Factor::Time,
    ];

    /// Canonical column header, as written by the grid search.
    pub fn column(self) -> &'static str {
        match self {
            Factor::TestSet => "Test_set",
            Factor::Corpus => "Corpus",
            Factor::Boundaries => "Boundaries",
            Factor::Cues => "Cues",
            Factor::Outcomes => "Outcomes",
            Factor::Stress => "Stress",
            Factor::Vowels => "Vowels",
            Factor::Method => "Method",
            Factor::Evaluation => "Evaluation",
            Factor::K => "K",
            Factor::Flush => "F",
            Factor::Time => "Time",
        }
    }

    /// Resolve a column header (case-insensitive, with a few aliases).
    pub fn from_column(name: &str) -> Option<Self> {
        let lowered = name.trim().to_ascii_lowercase();
        let factor = match lowered.as_str() {
            "test_set" | "test set" | "testset" => Factor::TestSet,
            "corpus" => Factor::Corpus,
            "boundaries" => Factor::Boundaries,
            "cues" => Factor::Cues,
            "outcomes" => Factor::Outcomes,
            "stress" => Factor::Stress,
            "vowels" => Factor::Vowels,
            "method" => Factor::Method,
            "evaluation" => Factor::Evaluation,
            "k" => Factor::K,
            "f" | "flush" => Factor::Flush,
            "time" => Factor::Time,
            _ => return None,
        };
        Some(factor)
    }

    /// K, flush and time are hyperparameters with a numeric order.
    pub fn is_numeric(self) -> bool {
        matches!(self, Factor::K | Factor::Flush | Factor::Time)
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Order levels the way they should appear on an axis or in a report:
    /// numerically for numeric factors, lexicographically otherwise.
    pub fn sort_levels(self, levels: &mut [String]) {
        if self.is_numeric() {
            levels.sort_by(|a, b| compare_numeric_levels(a, b));
        } else {
            levels.sort();
        }
    }
}

/// Numeric levels first (ascending), unparseable ones after in string order.
fn compare_numeric_levels(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for Factor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Factor::from_column(s).ok_or_else(|| format!("unknown factor '{}'", s))
    }
}

/// An outcome measure compared against its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    /// Tagging accuracy vs. the majority-tag baseline
    Accuracy,
    /// Entropy of predicted tags vs. entropy of the gold tags
    Entropy,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Accuracy, Metric::Entropy];

    /// Prefix of derived column names (`acc.diff`, `entr_St.diff`).
    pub fn prefix(self) -> &'static str {
        match self {
            Metric::Accuracy => "acc",
            Metric::Entropy => "entr",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Accuracy => "accuracy",
            Metric::Entropy => "entropy",
        }
    }

    /// Column holding the raw measure.
    pub fn column(self) -> &'static str {
        match self {
            Metric::Accuracy => "Accuracy",
            Metric::Entropy => "Entropy",
        }
    }

    /// Column holding the row-level baseline, when the grid search wrote one.
    pub fn baseline_column(self) -> &'static str {
        match self {
            Metric::Accuracy => "Majority_baseline",
            Metric::Entropy => "Entropy_baseline",
        }
    }

    pub fn other(self) -> Metric {
        match self {
            Metric::Accuracy => Metric::Entropy,
            Metric::Entropy => Metric::Accuracy,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "acc" | "accuracy" => Ok(Metric::Accuracy),
            "entr" | "entropy" => Ok(Metric::Entropy),
            other => Err(format!("unknown metric '{}' (expected acc or entr)", other)),
        }
    }
}

/// Numeric columns addressable by name in filters and exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericColumn {
    Raw(Metric),
    Baseline(Metric),
    Diff(Metric),
    StDiff(Metric),
    /// K, F or Time, parsed from the level string
    Level(Factor),
    X,
    Y,
}

impl NumericColumn {
    /// Derived columns in the order they are appended to an export.
    pub const DERIVED: [NumericColumn; 8] = [
        NumericColumn::Baseline(Metric::Accuracy),
        NumericColumn::Diff(Metric::Accuracy),
        NumericColumn::StDiff(Metric::Accuracy),
        NumericColumn::Baseline(Metric::Entropy),
        NumericColumn::Diff(Metric::Entropy),
        NumericColumn::StDiff(Metric::Entropy),
        NumericColumn::X,
        NumericColumn::Y,
    ];

    pub fn name(self) -> String {
        match self {
            NumericColumn::Raw(m) => m.column().to_string(),
            NumericColumn::Baseline(m) => format!("{}.baseline", m.prefix()),
            NumericColumn::Diff(m) => format!("{}.diff", m.prefix()),
            NumericColumn::StDiff(m) => format!("{}_St.diff", m.prefix()),
            NumericColumn::Level(f) => f.column().to_string(),
            NumericColumn::X => "X".to_string(),
            NumericColumn::Y => "Y".to_string(),
        }
    }

    /// Resolve a column name. Metric prefixes are case-insensitive.
    pub fn parse(name: &str) -> Option<Self> {
        let lowered = name.trim().to_ascii_lowercase();
        let column = match lowered.as_str() {
            "x" => NumericColumn::X,
            "y" => NumericColumn::Y,
            "accuracy" => NumericColumn::Raw(Metric::Accuracy),
            "entropy" => NumericColumn::Raw(Metric::Entropy),
            "majority_baseline" => NumericColumn::Baseline(Metric::Accuracy),
            "entropy_baseline" => NumericColumn::Baseline(Metric::Entropy),
            _ => {
                if let Some(factor) = Factor::from_column(&lowered).filter(|f| f.is_numeric()) {
                    return Some(NumericColumn::Level(factor));
                }
                let (prefix, suffix) = lowered.split_once(['.', '_'])?;
                let metric = prefix.parse::<Metric>().ok()?;
                match suffix {
                    "baseline" => NumericColumn::Baseline(metric),
                    "diff" => NumericColumn::Diff(metric),
                    "st.diff" | "st_diff" | "stdiff" => NumericColumn::StDiff(metric),
                    _ => return None,
                }
            }
        };
        Some(column)
    }
}

/// One row of the results table as loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    /// 1-based line number in the source file (0 when built in memory)
    pub line: usize,
    /// Level per factor, indexed by [`Factor::index`]. Absent factors are empty.
    pub levels: [String; FACTOR_COUNT],
    pub accuracy: f64,
    pub entropy: f64,
    /// `Majority_baseline` column, when present and numeric
    pub accuracy_baseline: Option<f64>,
    /// `Entropy_baseline` column, when present and numeric
    pub entropy_baseline: Option<f64>,
    /// Raw cells in header order, kept for lossless export
    pub cells: Vec<String>,
}

impl ResultRow {
    pub fn level(&self, factor: Factor) -> &str {
        &self.levels[factor.index()]
    }

    pub fn set_level(&mut self, factor: Factor, level: impl Into<String>) {
        self.levels[factor.index()] = level.into();
    }

    /// Level parsed as a number (K, F, Time).
    pub fn numeric_level(&self, factor: Factor) -> Option<f64> {
        self.level(factor).trim().parse().ok()
    }

    pub fn metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Accuracy => self.accuracy,
            Metric::Entropy => self.entropy,
        }
    }

    pub fn row_baseline(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Accuracy => self.accuracy_baseline,
            Metric::Entropy => self.entropy_baseline,
        }
    }
}

/// Difference of one metric against its baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricDiff {
    pub baseline: f64,
    /// `metric - baseline`
    pub diff: f64,
    /// `diff` scaled by the headroom in its direction, in [-1, 1]
    pub st_diff: f64,
}

/// A result row with its derived columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedRow {
    pub row: ResultRow,
    pub accuracy: MetricDiff,
    pub entropy: MetricDiff,
    pub x: f64,
    pub y: f64,
}

impl DerivedRow {
    pub fn new(row: ResultRow, accuracy: MetricDiff, entropy: MetricDiff) -> Self {
        Self {
            row,
            accuracy,
            entropy,
            x: 0.0,
            y: 0.0,
        }
    }

    pub fn diff(&self, metric: Metric) -> &MetricDiff {
        match metric {
            Metric::Accuracy => &self.accuracy,
            Metric::Entropy => &self.entropy,
        }
    }

    pub fn level(&self, factor: Factor) -> &str {
        self.row.level(factor)
    }

    /// Look up a numeric column. `None` when a level column is not a number.
    pub fn value(&self, column: NumericColumn) -> Option<f64> {
        match column {
            NumericColumn::Raw(m) => Some(self.row.metric(m)),
            NumericColumn::Baseline(m) => Some(self.diff(m).baseline),
            NumericColumn::Diff(m) => Some(self.diff(m).diff),
            NumericColumn::StDiff(m) => Some(self.diff(m).st_diff),
            NumericColumn::Level(f) => self.row.numeric_level(f),
            NumericColumn::X => Some(self.x),
            NumericColumn::Y => Some(self.y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_columns_roundtrip() {
        for factor in Factor::ALL {
            assert_eq!(Factor::from_column(factor.column()), Some(factor));
        }
        assert_eq!(Factor::from_column("flush"), Some(Factor::Flush));
        assert_eq!(Factor::from_column(" CUES "), Some(Factor::Cues));
        assert_eq!(Factor::from_column("Accuracy"), None);
    }

    #[test]
    fn test_numeric_level_sorting() {
        let mut levels = vec!["100".to_string(), "25".to_string(), "5".to_string(), "n/a".to_string()];
        Factor::K.sort_levels(&mut levels);
        assert_eq!(levels, vec!["5", "25", "100", "n/a"]);

        let mut cues = vec!["triphones".to_string(), "diphones".to_string()];
        Factor::Cues.sort_levels(&mut cues);
        assert_eq!(cues, vec!["diphones", "triphones"]);
    }

    #[test]
    fn test_numeric_column_names() {
        assert_eq!(NumericColumn::parse("acc_St.diff"), Some(NumericColumn::StDiff(Metric::Accuracy)));
        assert_eq!(NumericColumn::parse("entr.diff"), Some(NumericColumn::Diff(Metric::Entropy)));
        assert_eq!(NumericColumn::parse("acc.baseline"), Some(NumericColumn::Baseline(Metric::Accuracy)));
        assert_eq!(NumericColumn::parse("F"), Some(NumericColumn::Level(Factor::Flush)));
        assert_eq!(NumericColumn::parse("Corpus"), None);
        assert_eq!(NumericColumn::parse("acc.bogus"), None);

        for column in NumericColumn::DERIVED {
            assert_eq!(NumericColumn::parse(&column.name()), Some(column));
        }
    }

    #[test]
    fn test_metric_from_str() {
        assert_eq!("acc".parse::<Metric>(), Ok(Metric::Accuracy));
        assert_eq!("Entropy".parse::<Metric>(), Ok(Metric::Entropy));
        assert!("f1".parse::<Metric>().is_err());
    }
}
