//! Domain baselines: what a trivial tagger would score on the same test set.
//!
//! - **Majority baseline**: accuracy of always answering the most frequent tag.
//! - **Entropy baseline**: normalised entropy of the gold tag distribution.
//!
//! Baselines come from the results table itself (`Majority_baseline`,
//! `Entropy_baseline`) when the grid search wrote them, otherwise from the
//! per-corpus `[baselines.<corpus>]` tables in `posgrid.toml`. They can also
//! be computed from a test-set file of tagged items.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use crate::types::{Factor, Metric, ResultRow};

/// Baseline pair for one domain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub accuracy: f64,
    pub entropy: f64,
}

impl Baseline {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Accuracy => self.accuracy,
            Metric::Entropy => self.entropy,
        }
    }
}

/// Per-corpus baselines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaselineTable {
    by_corpus: BTreeMap<String, Baseline>,
}

impl BaselineTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, corpus: impl Into<String>, baseline: Baseline) {
        self.by_corpus.insert(corpus.into(), baseline);
    }

    pub fn get(&self, corpus: &str) -> Option<&Baseline> {
        self.by_corpus.get(corpus)
    }

    pub fn len(&self) -> usize {
        self.by_corpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_corpus.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Baseline)> {
        self.by_corpus.iter()
    }

    /// Baseline for a row: the row's own column first, then its corpus entry.
    pub fn resolve(&self, row: &ResultRow, metric: Metric) -> Result<f64> {
        if let Some(value) = row.row_baseline(metric) {
            return Ok(value);
        }
        let corpus = row.level(Factor::Corpus);
        self.get(corpus).map(|b| b.get(metric)).ok_or_else(|| {
            anyhow!(
                "line {}: no {} baseline for corpus '{}' (add [baselines.{}] to posgrid.toml)",
                row.line,
                metric.label(),
                corpus,
                corpus
            )
        })
    }
}

impl FromIterator<(String, Baseline)> for BaselineTable {
    fn from_iter<I: IntoIterator<Item = (String, Baseline)>>(iter: I) -> Self {
        Self {
            by_corpus: iter.into_iter().collect(),
        }
    }
}

/// Read the gold tags of a test-set file.
pub fn read_test_items(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read test set '{}'", path.display()))?;
    Ok(parse_test_items(&text))
}

/// Each line is `orthography|TAG<TAB>phonology|TAG`; the tag of the last
/// field is taken. Lines without a `|` are skipped.
pub fn parse_test_items(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let item = line.trim().split('\t').last()?;
            let (_, tag) = item.rsplit_once('|')?;
            let tag = tag.trim();
            (!tag.is_empty()).then(|| tag.to_string())
        })
        .collect()
}

fn tag_counts(tags: &[String]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for tag in tags {
        *counts.entry(tag.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Share of the most frequent tag.
pub fn majority_baseline(tags: &[String]) -> Result<f64> {
    if tags.is_empty() {
        bail!("cannot compute a majority baseline from an empty tag list");
    }
    let top = tag_counts(tags).values().copied().max().unwrap_or(0);
    Ok(top as f64 / tags.len() as f64)
}

/// Shannon entropy of the tag distribution, normalised by the log of the
/// number of distinct tags so the result lies in [0, 1].
pub fn entropy_baseline(tags: &[String]) -> Result<f64> {
    if tags.is_empty() {
        bail!("cannot compute an entropy baseline from an empty tag list");
    }
    let counts = tag_counts(tags);
    if counts.len() < 2 {
        return Ok(0.0);
    }
    let total = tags.len() as f64;
    let h: f64 = counts
        .values()
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.ln()
        })
        .sum();
    Ok(h / (counts.len() as f64).ln())
}

pub fn compute_baselines(tags: &[String]) -> Result<Baseline> {
    Ok(Baseline {
        accuracy: majority_baseline(tags)?,
        entropy: entropy_baseline(tags)?,
    })
}

/// Tag frequencies, most frequent first.
pub fn tag_distribution(tags: &[String]) -> Vec<(String, usize)> {
    let mut dist: Vec<(String, usize)> = tag_counts(tags)
        .into_iter()
        .map(|(tag, n)| (tag.to_string(), n))
        .collect();
    dist.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    dist
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(counts: &[(&str, usize)]) -> Vec<String> {
        counts.iter()
            .flat_map(|(t, n)| std::iter::repeat(t.to_string()).take(*n))
            .collect()
    }

    #[test]
    fn test_majority_baseline() {
        let t = tags(&[("N", 6), ("V", 3), ("A", 1)]);
        assert!((majority_baseline(&t).unwrap() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_entropy_baseline_bounds() {
        let uniform = tags(&[("N", 5), ("V", 5), ("A", 5), ("B", 5)]);
        assert!((entropy_baseline(&uniform).unwrap() - 1.0).abs() < 1e-12);

        let single = tags(&[("N", 7)]);
        assert_eq!(entropy_baseline(&single).unwrap(), 0.0);

        let skewed = tags(&[("N", 9), ("V", 1)]);
        let h = entropy_baseline(&skewed).unwrap();
        // -(0.9 ln 0.9 + 0.1 ln 0.1) / ln 2
        assert!((h - 0.468_995_593_589_281).abs() < 1e-9, "got {}", h);
    }

    #[test]
    fn test_empty_tags_rejected() {
        assert!(majority_baseline(&[]).is_err());
        assert!(entropy_baseline(&[]).is_err());
    }

    #[test]
    fn test_parse_test_items() {
        let text = "dog|N\tdQg|N\nrun|V\trVn|V\n\nbroken line\nsingle|A\n";
        assert_eq!(parse_test_items(text), vec!["N", "V", "A"]);
    }

    #[test]
    fn test_tag_distribution_order() {
        let t = tags(&[("V", 2), ("N", 3), ("A", 2)]);
        let dist = tag_distribution(&t);
        assert_eq!(dist[0], ("N".to_string(), 3));
        assert_eq!(dist[1], ("A".to_string(), 2));
        assert_eq!(dist[2], ("V".to_string(), 2));
    }

    #[test]
    fn test_resolve_prefers_row_column() {
        let mut table = BaselineTable::new();
        table.insert("manchester", Baseline { accuracy: 0.3, entropy: 0.7 });

        let mut row = ResultRow::default();
        row.line = 4;
        row.set_level(Factor::Corpus, "manchester");
        row.accuracy_baseline = Some(0.25);

        assert_eq!(table.resolve(&row, Metric::Accuracy).unwrap(), 0.25);
        assert_eq!(table.resolve(&row, Metric::Entropy).unwrap(), 0.7);

        row.set_level(Factor::Corpus, "providers");
        let err = table.resolve(&row, Metric::Entropy).unwrap_err().to_string();
        assert!(err.contains("providers") && err.contains("line 4"), "got: {}", err);
    }
}
