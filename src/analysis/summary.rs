//! Grid-level summary of standardized differences.
//!
//! Answers two questions about a grid:
//! 1. Which configuration beats its baseline by the widest margin?
//! 2. Which factors matter? For every factor we average the standardized
//!    difference per level (marginal means). The spread between the best and
//!    worst level is the factor's importance: a factor whose levels all
//!    average the same is not load-bearing.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::rendering::colors::Colorizer;
use crate::types::{DerivedRow, Factor, Metric};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelMean {
    pub level: String,
    pub mean: f64,
    pub n: usize,
}

/// Marginal means of one factor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorEffect {
    pub factor: Factor,
    /// Levels in axis order
    pub levels: Vec<LevelMean>,
    /// max(mean) - min(mean)
    pub spread: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestConfig {
    pub line: usize,
    /// Levels of the factors that vary across the grid
    pub levels: Vec<(Factor, String)>,
    pub st_diff: f64,
    /// The other metric's standardized difference, used for tie-breaking
    pub other_st_diff: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridSummary {
    pub metric: Metric,
    pub n: usize,
    /// Rows beating the baseline (st_diff > 0)
    pub above_baseline: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub best: Option<BestConfig>,
    /// Sorted by spread, largest first
    pub effects: Vec<FactorEffect>,
}

impl GridSummary {
    pub fn compute(rows: &[&DerivedRow], metric: Metric) -> Self {
        let values: Vec<f64> = rows.iter().map(|r| r.diff(metric).st_diff).collect();
        let varying = varying_factors(rows);

        Self {
            metric,
            n: rows.len(),
            above_baseline: values.iter().filter(|&&v| v > 0.0).count(),
            mean: mean(&values),
            median: median(&values),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            best: best_config(rows, metric, &varying),
            effects: factor_effects(rows, metric, &varying),
        }
    }
}

/// Factors with more than one level across the rows.
pub fn varying_factors(rows: &[&DerivedRow]) -> Vec<Factor> {
    Factor::ALL
        .into_iter()
        .filter(|&factor| {
            let mut levels = rows.iter().map(|r| r.level(factor));
            match levels.next() {
                Some(first) => levels.any(|l| l != first),
                None => false,
            }
        })
        .collect()
}

/// Highest st_diff wins; ties go to the row whose other metric sits closest
/// to its own baseline.
fn best_config(rows: &[&DerivedRow], metric: Metric, varying: &[Factor]) -> Option<BestConfig> {
    let best = rows.iter().max_by(|a, b| {
        let primary = a.diff(metric).st_diff.total_cmp(&b.diff(metric).st_diff);
        primary.then_with(|| {
            let da = a.diff(metric.other()).st_diff.abs();
            let db = b.diff(metric.other()).st_diff.abs();
            // Smaller deviation ranks higher
            db.total_cmp(&da)
        })
    })?;

    Some(BestConfig {
        line: best.row.line,
        levels: varying
            .iter()
            .map(|&f| (f, best.level(f).to_string()))
            .collect(),
        st_diff: best.diff(metric).st_diff,
        other_st_diff: best.diff(metric.other()).st_diff,
    })
}

fn factor_effects(rows: &[&DerivedRow], metric: Metric, varying: &[Factor]) -> Vec<FactorEffect> {
    let mut effects: Vec<FactorEffect> = varying
        .iter()
        .map(|&factor| {
            let mut by_level: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
            for row in rows {
                by_level
                    .entry(row.level(factor))
                    .or_default()
                    .push(row.diff(metric).st_diff);
            }

            let mut names: Vec<String> = by_level.keys().map(|s| s.to_string()).collect();
            factor.sort_levels(&mut names);

            let levels: Vec<LevelMean> = names
                .into_iter()
                .map(|level| {
                    let values = &by_level[level.as_str()];
                    LevelMean {
                        mean: mean(values),
                        n: values.len(),
                        level,
                    }
                })
                .collect();

            let max = levels.iter().map(|l| l.mean).fold(f64::NEG_INFINITY, f64::max);
            let min = levels.iter().map(|l| l.mean).fold(f64::INFINITY, f64::min);

            FactorEffect {
                factor,
                levels,
                spread: max - min,
            }
        })
        .collect();

    effects.sort_by(|a, b| b.spread.partial_cmp(&a.spread).unwrap_or(Ordering::Equal));
    effects
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Render the summary as a terminal report.
pub fn format_summary(summary: &GridSummary, color: bool) -> String {
    let c = Colorizer::new(color);
    let mut out = Vec::new();
    let name = format!("{}_St.diff", summary.metric.prefix());

    let title = format!("=== {} ({} rows) ===", name, summary.n);
    out.push(c.header(&title));

    if summary.n == 0 {
        out.push("  no rows".to_string());
        return out.join("\n");
    }

    out.push(format!(
        "  mean {}  median {}  range [{}, {}]  above baseline {}/{}",
        c.signed(summary.mean),
        c.signed(summary.median),
        c.signed(summary.min),
        c.signed(summary.max),
        summary.above_baseline,
        summary.n
    ));

    if let Some(best) = &summary.best {
        let config: Vec<String> = best
            .levels
            .iter()
            .map(|(f, l)| format!("{}={}", f, l))
            .collect();
        out.push(format!(
            "  best (line {}): {} ({} / {} {})",
            best.line,
            c.signed(best.st_diff),
            config.join(" "),
            summary.metric.other().prefix(),
            c.signed(best.other_st_diff)
        ));
    }

    if !summary.effects.is_empty() {
        out.push(String::new());
        out.push("  Factor importance (spread of level means)".to_string());
        for effect in &summary.effects {
            let bar_len = (effect.spread * 25.0).round() as usize;
            let bar = "█".repeat(bar_len.min(50));
            out.push(format!(
                "  {:>12}: {:>6.4} {}",
                effect.factor.column(),
                effect.spread,
                c.bar(&bar)
            ));
            for level in &effect.levels {
                out.push(format!(
                    "  {:>12}  {:<14} {} (n={})",
                    "",
                    level.level,
                    c.signed(level.mean),
                    level.n
                ));
            }
        }
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MetricDiff, ResultRow};

    fn row(line: usize, cues: &str, k: &str, acc_st: f64, entr_st: f64) -> DerivedRow {
        let mut r = ResultRow::default();
        r.line = line;
        r.set_level(Factor::Corpus, "manchester");
        r.set_level(Factor::Cues, cues);
        r.set_level(Factor::K, k);
        DerivedRow::new(
            r,
            MetricDiff { baseline: 0.3, diff: 0.0, st_diff: acc_st },
            MetricDiff { baseline: 0.7, diff: 0.0, st_diff: entr_st },
        )
    }

    fn grid() -> Vec<DerivedRow> {
        vec![
            row(2, "diphones", "50", 0.2, -0.1),
            row(3, "diphones", "100", 0.4, 0.3),
            row(4, "triphones", "50", -0.2, 0.0),
            row(5, "triphones", "100", 0.4, 0.05),
        ]
    }

    #[test]
    fn test_basic_statistics() {
        let rows = grid();
        let refs: Vec<&DerivedRow> = rows.iter().collect();
        let s = GridSummary::compute(&refs, Metric::Accuracy);

        assert_eq!(s.n, 4);
        assert_eq!(s.above_baseline, 3);
        assert!((s.mean - 0.2).abs() < 1e-12);
        assert!((s.median - 0.3).abs() < 1e-12);
        assert!((s.min + 0.2).abs() < 1e-12);
        assert!((s.max - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_best_config_tie_break() {
        let rows = grid();
        let refs: Vec<&DerivedRow> = rows.iter().collect();
        let best = GridSummary::compute(&refs, Metric::Accuracy).best.unwrap();

        // Lines 3 and 5 tie on accuracy; line 5 has entropy closer to baseline
        assert_eq!(best.line, 5);
        assert_eq!(
            best.levels,
            vec![(Factor::Cues, "triphones".to_string()), (Factor::K, "100".to_string())]
        );
    }

    #[test]
    fn test_factor_effects_ranked_by_spread() {
        let rows = grid();
        let refs: Vec<&DerivedRow> = rows.iter().collect();
        let s = GridSummary::compute(&refs, Metric::Accuracy);

        // K: 50 -> 0.0, 100 -> 0.4 (spread 0.4); Cues: 0.3 vs 0.1 (spread 0.2)
        assert_eq!(s.effects.len(), 2);
        assert_eq!(s.effects[0].factor, Factor::K);
        assert!((s.effects[0].spread - 0.4).abs() < 1e-12);
        assert_eq!(s.effects[0].levels[0].level, "50");
        assert_eq!(s.effects[1].factor, Factor::Cues);
        assert!((s.effects[1].spread - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_empty_summary() {
        let s = GridSummary::compute(&[], Metric::Entropy);
        assert_eq!(s.n, 0);
        assert!(s.best.is_none());
        assert!(s.effects.is_empty());
        assert!(format_summary(&s, false).contains("no rows"));
    }

    #[test]
    fn test_format_summary_plain() {
        let rows = grid();
        let refs: Vec<&DerivedRow> = rows.iter().collect();
        let text = format_summary(&GridSummary::compute(&refs, Metric::Accuracy), false);
        assert!(text.contains("acc_St.diff (4 rows)"));
        assert!(text.contains("best (line 5)"));
        assert!(!text.contains('\u{1b}'), "plain output must not contain ANSI escapes");
    }
}
