//! Row listing for `posgrid --list`.
//!
//! Only factors that vary across the listed rows get a column; constant
//! factors are folded into a header line so wide grids stay readable.

use crate::analysis::summary::varying_factors;
use crate::rendering::colors::Colorizer;
use crate::types::{DerivedRow, Factor, Metric};

/// Tabular listing of `rows`, aligned for a terminal.
pub fn format_rows(rows: &[&DerivedRow], color: bool) -> String {
    let c = Colorizer::new(color);
    if rows.is_empty() {
        return c.dim("no rows match");
    }

    let varying = varying_factors(rows);
    let mut out = Vec::new();

    let constant: Vec<String> = Factor::ALL
        .into_iter()
        .filter(|f| !varying.contains(f))
        .filter_map(|f| {
            let level = rows[0].level(f);
            (!level.is_empty()).then(|| format!("{}={}", f.column(), level))
        })
        .collect();
    if !constant.is_empty() {
        out.push(c.dim(&format!("# {}", constant.join(" "))));
    }

    let widths: Vec<usize> = varying
        .iter()
        .map(|&f| {
            rows.iter()
                .map(|r| r.level(f).len())
                .chain(std::iter::once(f.column().len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut header = format!("{:>6}", "line");
    for (f, w) in varying.iter().zip(&widths) {
        header.push_str(&format!("  {:<w$}", f.column(), w = *w));
    }
    for metric in Metric::ALL {
        header.push_str(&format!("  {:>12}", format!("{}_St.diff", metric.prefix())));
    }
    header.push_str(&format!("  {:>8}  {:>8}", "X", "Y"));
    out.push(c.header(&header));

    for row in rows {
        let mut line = format!("{:>6}", row.row.line);
        for (f, w) in varying.iter().zip(&widths) {
            line.push_str(&format!("  {:<w$}", row.level(*f), w = *w));
        }
        for metric in Metric::ALL {
            let value = row.diff(metric).st_diff;
            // Pad before painting; escapes would throw off the width
            line.push_str(&format!("  {:>5}{}", "", c.signed(value)));
        }
        line.push_str(&format!("  {:>8.2}  {:>8.2}", row.x, row.y));
        out.push(line);
    }

    out.push(c.dim(&format!("{} row(s)", rows.len())));
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MetricDiff, ResultRow};

    fn row(line: usize, cues: &str, acc: f64) -> DerivedRow {
        let mut r = ResultRow::default();
        r.line = line;
        r.set_level(Factor::Corpus, "manchester");
        r.set_level(Factor::Cues, cues);
        DerivedRow::new(
            r,
            MetricDiff { baseline: 0.3, diff: 0.0, st_diff: acc },
            MetricDiff { baseline: 0.7, diff: 0.0, st_diff: 0.0 },
        )
    }

    #[test]
    fn test_varying_factors_become_columns() {
        let rows = vec![row(2, "diphones", 0.25), row(3, "triphones", -0.5)];
        let refs: Vec<&DerivedRow> = rows.iter().collect();
        let text = format_rows(&refs, false);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "# Corpus=manchester");
        assert!(lines[1].contains("Cues"));
        assert!(!lines[1].contains("Corpus"));
        assert!(lines[2].contains("diphones") && lines[2].contains("+0.2500"));
        assert!(lines[3].contains("triphones") && lines[3].contains("-0.5000"));
        assert_eq!(lines[4], "2 row(s)");
    }

    #[test]
    fn test_empty_listing() {
        assert_eq!(format_rows(&[], false), "no rows match");
    }
}
