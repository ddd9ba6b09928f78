//! Tab-separated results loading.
//!
//! The grid search dumps one row per parametrization with a header line.
//! Pandas may prepend an unnamed index column; that column is kept as a raw
//! cell but otherwise ignored.
//!
//! Parsing goes through polars with every column read as a string, so factor
//! levels such as `F = 0` keep their spelling. Metric columns are cast to
//! `Float64` afterwards; nulls from the cast mark missing or non-numeric cells.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use polars::prelude::*;

use crate::types::{FACTOR_COUNT, Factor, Metric, ResultRow};

/// A loaded results table.
#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    /// Header cells in file order
    pub header: Vec<String>,
    pub rows: Vec<ResultRow>,
    pub source: Option<PathBuf>,
}

impl ResultTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether a column exists, compared the same way columns are resolved.
    pub fn has_column(&self, name: &str) -> bool {
        find_column(&self.header, name).is_some()
    }

    /// Factors that have a column in this table.
    pub fn present_factors(&self) -> Vec<Factor> {
        let mut factors: Vec<Factor> = self
            .header
            .iter()
            .filter_map(|h| Factor::from_column(h))
            .collect();
        factors.sort();
        factors.dedup();
        factors
    }
}

/// Case-insensitive header lookup, first match wins.
pub fn find_column(header: &[String], name: &str) -> Option<usize> {
    header
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}

/// Column positions resolved from the header.
struct ColumnMap {
    factors: [Option<usize>; FACTOR_COUNT],
    accuracy: usize,
    entropy: usize,
    accuracy_baseline: Option<usize>,
    entropy_baseline: Option<usize>,
}

impl ColumnMap {
    fn from_header(header: &[String]) -> Result<Self> {
        let mut factors = [None; FACTOR_COUNT];
        for (idx, cell) in header.iter().enumerate() {
            if let Some(factor) = Factor::from_column(cell) {
                // First occurrence wins
                if factors[factor.index()].is_none() {
                    factors[factor.index()] = Some(idx);
                }
            }
        }

        if factors[Factor::Corpus.index()].is_none() {
            bail!("missing required column 'Corpus'");
        }

        let accuracy = find_column(header, Metric::Accuracy.column())
            .ok_or_else(|| anyhow!("missing required column 'Accuracy'"))?;
        let entropy = find_column(header, Metric::Entropy.column())
            .ok_or_else(|| anyhow!("missing required column 'Entropy'"))?;

        Ok(Self {
            factors,
            accuracy,
            entropy,
            accuracy_baseline: find_column(header, Metric::Accuracy.baseline_column()),
            entropy_baseline: find_column(header, Metric::Entropy.baseline_column()),
        })
    }
}

/// Read a results table from disk.
pub fn read_results(path: &Path) -> Result<ResultTable> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read results table '{}'", path.display()))?;
    let mut table = parse_results(&text)
        .with_context(|| format!("Failed to parse results table '{}'", path.display()))?;
    table.source = Some(path.to_path_buf());
    Ok(table)
}

/// All-string frame without a header row; the header is frame row 0 so an
/// empty pandas index name survives as-is.
fn read_frame(text: String) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(false)
        .with_infer_schema_length(Some(0))
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(b'\t')
                .with_quote_char(None),
        )
        .into_reader_with_file_handle(Cursor::new(text.into_bytes()))
        .finish()
}

fn string_cells(column: &Column) -> Result<Vec<String>> {
    Ok(column
        .str()?
        .into_iter()
        .map(|cell| cell.unwrap_or("").trim().to_string())
        .collect())
}

fn float_cells(column: &Column) -> Result<Vec<Option<f64>>> {
    let cast = column.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

/// Parse tab-separated results text.
pub fn parse_results(text: &str) -> Result<ResultTable> {
    // Source line number of every line handed to polars
    let mut kept: Vec<&str> = Vec::new();
    let mut line_numbers: Vec<usize> = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        kept.push(line);
        line_numbers.push(i + 1);
    }
    if kept.is_empty() {
        bail!("table is empty");
    }

    let width = field_count(kept[0]);
    for (line, &line_no) in kept.iter().zip(&line_numbers).skip(1) {
        let found = field_count(line);
        if found != width {
            bail!("line {}: expected {} fields, found {}", line_no, width, found);
        }
    }

    let frame = read_frame(kept.join("\n")).context("malformed tab-separated table")?;
    let columns = frame.get_columns();

    let cells: Vec<Vec<String>> = columns.iter().map(string_cells).collect::<Result<_>>()?;
    let header: Vec<String> = cells
        .iter()
        .map(|column| column.first().cloned().unwrap_or_default())
        .collect();
    let map = ColumnMap::from_header(&header)?;

    let floats = |idx: usize| float_cells(&columns[idx]);
    let accuracy = floats(map.accuracy)?;
    let entropy = floats(map.entropy)?;
    let accuracy_baseline = map.accuracy_baseline.map(floats).transpose()?;
    let entropy_baseline = map.entropy_baseline.map(floats).transpose()?;

    let mut rows = Vec::with_capacity(frame.height().saturating_sub(1));
    for i in 1..frame.height() {
        let line = line_numbers[i];
        let row_cells: Vec<String> = cells.iter().map(|column| column[i].clone()).collect();

        let mut row = ResultRow {
            line,
            accuracy: require_metric(accuracy[i], &row_cells[map.accuracy], line, Metric::Accuracy)?,
            entropy: require_metric(entropy[i], &row_cells[map.entropy], line, Metric::Entropy)?,
            accuracy_baseline: optional_value(accuracy_baseline.as_deref(), i),
            entropy_baseline: optional_value(entropy_baseline.as_deref(), i),
            ..Default::default()
        };

        for factor in Factor::ALL {
            if let Some(idx) = map.factors[factor.index()] {
                row.set_level(factor, row_cells[idx].as_str());
            }
        }
        if row.level(Factor::Corpus).is_empty() {
            bail!("line {}: empty Corpus", line);
        }

        row.cells = row_cells;
        rows.push(row);
    }

    Ok(ResultTable {
        header,
        rows,
        source: None,
    })
}

fn field_count(line: &str) -> usize {
    line.matches('\t').count() + 1
}

fn require_metric(value: Option<f64>, cell: &str, line: usize, metric: Metric) -> Result<f64> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        _ => bail!("line {}: column {} has non-numeric value '{}'", line, metric.column(), cell),
    }
}

/// Null or NaN cells count as missing.
fn optional_value(column: Option<&[Option<f64>]>, i: usize) -> Option<f64> {
    column
        .and_then(|values| values.get(i).copied().flatten())
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRID: &str = "\
Test_set\tCorpus\tBoundaries\tCues\tOutcomes\tStress\tVowels\tMethod\tEvaluation\tK\tF\tTime\tAccuracy\tMajority_baseline\tEntropy\tEntropy_baseline\tPoS\tFrequency
items.txt\tmanchester\tyes\tdiphones\tlemmas\tstress\tfull\tfreq\tcount\t50\t0\t100\t0.42\t0.31\t0.61\t0.78\tN\t120
items.txt\tmanchester\tno\ttriphones\tlemmas\tno-stress\treduced\tsum\tdistr\t100\t50\t100\t0.28\t0.31\t0.90\t0.78\tV\t80
";

    #[test]
    fn test_parse_grid_table() {
        let table = parse_results(GRID).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.header.len(), 18);

        let row = &table.rows[0];
        assert_eq!(row.line, 2);
        assert_eq!(row.level(Factor::Corpus), "manchester");
        assert_eq!(row.level(Factor::Cues), "diphones");
        assert_eq!(row.level(Factor::Flush), "0");
        assert_eq!(row.numeric_level(Factor::K), Some(50.0));
        assert!((row.accuracy - 0.42).abs() < 1e-12);
        assert_eq!(row.accuracy_baseline, Some(0.31));
        assert_eq!(row.entropy_baseline, Some(0.78));
        assert_eq!(row.cells.len(), 18);
    }

    #[test]
    fn test_pandas_index_column_and_missing_factors() {
        let text = "\tCorpus\tAccuracy\tEntropy\n0\tproviders\t0.5\t0.4\n1\tproviders\t0.6\t0.3\n";
        let table = parse_results(text).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1].level(Factor::Corpus), "providers");
        assert_eq!(table.rows[1].level(Factor::Cues), "");
        assert_eq!(table.rows[1].accuracy_baseline, None);
        assert_eq!(table.present_factors(), vec![Factor::Corpus]);
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        let text = "# grid dump\n\nCorpus\tAccuracy\tEntropy\n\nmanchester\t0.5\t0.4\n";
        let table = parse_results(text).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0].line, 5);
    }

    #[test]
    fn test_field_count_mismatch_reports_line() {
        let text = "Corpus\tAccuracy\tEntropy\nmanchester\t0.5\n";
        let err = parse_results(text).unwrap_err().to_string();
        assert!(err.contains("line 2"), "got: {}", err);
    }

    #[test]
    fn test_missing_required_column() {
        let err = parse_results("Corpus\tAccuracy\nx\t0.5\n").unwrap_err().to_string();
        assert!(err.contains("Entropy"), "got: {}", err);
    }

    #[test]
    fn test_nan_metric_rejected_but_nan_baseline_missing() {
        let err = parse_results("Corpus\tAccuracy\tEntropy\nx\tNaN\t0.5\n").unwrap_err();
        assert!(err.to_string().contains("Accuracy"));

        let table =
            parse_results("Corpus\tAccuracy\tEntropy\tMajority_baseline\nx\t0.4\t0.5\tnan\n").unwrap();
        assert_eq!(table.rows[0].accuracy_baseline, None);
    }

    #[test]
    fn test_has_column_ignores_case() {
        let table = parse_results("corpus\taccuracy\tentropy\tmajority_baseline\nx\t0.4\t0.5\t0.3\n").unwrap();
        assert!(table.has_column(Metric::Accuracy.baseline_column()));
        assert!(!table.has_column(Metric::Entropy.baseline_column()));
        assert_eq!(table.rows[0].accuracy_baseline, Some(0.3));
    }

    #[test]
    fn test_empty_baseline_cell_is_missing() {
        let table =
            parse_results("Corpus\tAccuracy\tEntropy\tEntropy_baseline\nx\t0.4\t0.5\t\ny\t0.4\t0.5\t0.7\n").unwrap();
        assert_eq!(table.rows[0].entropy_baseline, None);
        assert_eq!(table.rows[1].entropy_baseline, Some(0.7));
        assert_eq!(table.rows[0].cells[3], "");
    }

    #[test]
    fn test_read_results_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.txt");
        std::fs::write(&path, GRID).unwrap();

        let table = read_results(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.source.as_deref(), Some(path.as_path()));

        let missing = read_results(&dir.path().join("nope.txt"));
        assert!(missing.is_err());
    }
}
