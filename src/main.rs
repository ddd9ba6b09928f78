//! posgrid CLI - baseline comparison for PoS-tagging grid results
//!
//! Orchestrates the pipeline over one results table:
//!
//! 1. Config: posgrid.toml next to the table (or `--config`)
//! 2. Load: parse the tab-separated results
//! 3. Derive: diff and standardized diff against per-corpus baselines
//! 4. Layout: place every configuration on the synthetic X/Y axes
//! 5. Filter: threshold predicate from `--filter` or the config
//! 6. Output: row listing, summary, TSV/JSON export, scatterplot
//!
//! Reports go to stdout; progress and warnings go to stderr.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Instant;

use posgrid::analysis::{GridSummary, Predicate, derive, filter_rows, format_summary, selection_mask};
use posgrid::config::Config;
use posgrid::layout::Axis;
use posgrid::rendering::{format_rows, render_grid};
use posgrid::table::{ResultTable, read_results, write_json, write_results};
use posgrid::types::Metric;

/// Baseline comparison and grid plots for PoS-tagging experiments
///
/// Reads a grid-search results table, expresses every accuracy and entropy
/// score as a standardized difference from its corpus baseline, and lists,
/// summarizes, exports, or plots the configurations that pass a filter.
///
/// Examples:
///   posgrid results.tsv                                 # List all rows
///   posgrid results.tsv -f 'acc_St.diff > 0'            # Rows above baseline
///   posgrid results.tsv --summary -m acc                # Best config + factor importance
///   posgrid results.tsv --plot grid.png --export out.tsv
#[derive(Parser, Debug)]
#[command(name = "posgrid")]
#[command(version)]
#[command(about, long_about = None)]
pub struct Cli {
    /// Tab-separated results table
    #[arg(value_name = "RESULTS")]
    pub results: PathBuf,

    /// Row filter expression
    ///
    /// Overrides the config's `filter`. Examples:
    ///   -f 'acc_St.diff > 0'
    ///   -f 'acc_St.diff > 0 and -0.25 < entr_St.diff < 0.25'
    ///   -f 'Cues == "triphones" or K >= 50'
    #[arg(short, long, value_name = "EXPR")]
    pub filter: Option<String>,

    /// Ignore any filter (including the config's)
    #[arg(long, conflicts_with = "filter")]
    pub no_filter: bool,

    /// Write matching rows with derived columns as TSV
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Write matching rows with derived columns as JSON
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Render the grid scatterplot (.svg for vector output, PNG otherwise)
    ///
    /// Every row is drawn; rows rejected by the filter are faded.
    #[arg(short, long, value_name = "PATH")]
    pub plot: Option<PathBuf>,

    /// Figure width in pixels (overrides config)
    #[arg(long)]
    pub width: Option<u32>,

    /// Figure height in pixels (overrides config)
    #[arg(long)]
    pub height: Option<u32>,

    /// Print best configuration and factor importance
    #[arg(short, long)]
    pub summary: bool,

    /// Limit the summary to one metric (acc or entr)
    #[arg(short, long, value_name = "METRIC")]
    pub metric: Option<Metric>,

    /// List matching rows (default when no other output is requested)
    #[arg(short, long)]
    pub list: bool,

    /// Config file (skips posgrid.toml discovery)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Verbose output
    ///
    /// Shows progress with timings on stderr:
    ///   "Loaded 768 rows"
    ///   "Filter kept 112/768 rows"
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl Cli {
    fn list_mode(&self) -> bool {
        self.list
            || !(self.summary || self.export.is_some() || self.json.is_some() || self.plot.is_some())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = run(&cli)?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}

/// Directory posgrid.toml discovery starts from.
fn config_dir(results: &Path) -> PathBuf {
    let dir = results
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf())
}

/// Execute the pipeline; returns the stdout report.
fn run(cli: &Cli) -> Result<String> {
    let start = Instant::now();
    let color = !cli.no_color;

    // ══════════════════════════════════════════════════════════════════════════
    // Stage 1: Config
    // ══════════════════════════════════════════════════════════════════════════
    let config = match &cli.config {
        Some(path) => Config::load_file(path)?,
        None => Config::load(&config_dir(&cli.results))?,
    };

    if cli.verbose {
        eprintln!("📊 posgrid v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("📂 Results: {}", cli.results.display());
        eprintln!("{}", config.display_summary());
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Stage 2: Load + derive
    // ══════════════════════════════════════════════════════════════════════════
    let table = read_results(&cli.results)?;
    if table.is_empty() {
        eprintln!("⚠️  {} has no data rows", cli.results.display());
    }

    if !has_row_baselines(&table) && !table.is_empty() {
        if config.baselines.is_empty() {
            eprintln!("⚠️  No baseline columns and no [baselines] in config; rows need both");
        } else if cli.verbose {
            eprintln!("   Baselines from config for rows without baseline columns");
        }
    }

    let mut rows = derive(&table, &config.baselines)?;

    if cli.verbose {
        eprintln!(
            "✓ Loaded {} rows, factors: {} ({:.2?})",
            rows.len(),
            table
                .present_factors()
                .iter()
                .map(|f| f.column())
                .collect::<Vec<_>>()
                .join(", "),
            start.elapsed()
        );
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Stage 3: Layout
    // ══════════════════════════════════════════════════════════════════════════
    let layout = config.layout.place(&mut rows)?;
    if let Some(warning) = layout.unplaced_warning() {
        eprintln!("⚠️  {}", warning);
    }

    if cli.verbose {
        eprintln!(
            "✓ Layout: X = {}; Y = {}",
            layout.description(Axis::X),
            layout.description(Axis::Y)
        );
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Stage 4: Filter
    // ══════════════════════════════════════════════════════════════════════════
    let filter_text = if cli.no_filter {
        None
    } else {
        cli.filter.as_deref().or(config.filter.as_deref())
    };
    let predicate = filter_text
        .map(|text| Predicate::parse(text).with_context(|| format!("Invalid filter '{}'", text)))
        .transpose()?;

    let selected = filter_rows(&rows, predicate.as_ref());

    if cli.verbose {
        match &predicate {
            Some(p) => eprintln!("✓ Filter '{}' kept {}/{} rows", p, selected.len(), rows.len()),
            None => eprintln!("✓ No filter, {} rows", rows.len()),
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Stage 5: Output
    // ══════════════════════════════════════════════════════════════════════════
    let mut report = Vec::new();

    if cli.list_mode() {
        report.push(format_rows(&selected, color));
    }

    if cli.summary {
        let metrics: Vec<Metric> = match cli.metric {
            Some(m) => vec![m],
            None => Metric::ALL.to_vec(),
        };
        for metric in metrics {
            let summary = GridSummary::compute(&selected, metric);
            report.push(format_summary(&summary, color));
        }
    }

    if let Some(path) = &cli.export {
        write_results(path, &table.header, &selected)?;
        if cli.verbose {
            eprintln!("✓ Exported {} rows to {}", selected.len(), path.display());
        }
    }

    if let Some(path) = &cli.json {
        write_json(path, &table.header, &selected)?;
        if cli.verbose {
            eprintln!("✓ Wrote JSON to {}", path.display());
        }
    }

    if let Some(path) = &cli.plot {
        let mut options = config.plot.clone();
        if let Some(width) = cli.width {
            options.width = width;
        }
        if let Some(height) = cli.height {
            options.height = height;
        }

        let plot_start = Instant::now();
        let mask = selection_mask(&rows, predicate.as_ref());
        render_grid(&rows, &mask, &layout, &options, path)
            .map_err(|e| anyhow!("Failed to render plot '{}': {}", path.display(), e))?;
        if cli.verbose {
            eprintln!("✓ Plot saved to {} ({:.2?})", path.display(), plot_start.elapsed());
        }
    }

    if cli.verbose {
        eprintln!("✓ Done in {:.2?}", start.elapsed());
    }

    Ok(report.join("\n\n"))
}

/// Every metric has its baseline column, matched the way the reader matches headers.
fn has_row_baselines(table: &ResultTable) -> bool {
    Metric::ALL.iter().all(|m| table.has_column(m.baseline_column()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS: &str = "Test_set\tCorpus\tCues\tMethod\tK\tAccuracy\tMajority_baseline\tEntropy\tEntropy_baseline\n\
        test\tmanchester\tdiphones\tfreq\t25\t0.65\t0.30\t0.60\t0.80\n\
        test\tmanchester\ttriphones\tfreq\t25\t0.20\t0.30\t0.90\t0.80\n\
        test\tmanchester\tdiphones\tsum\t25\t0.45\t0.30\t0.70\t0.80\n";

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["posgrid"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    fn results_file(dir: &Path) -> PathBuf {
        let path = dir.join("results.tsv");
        std::fs::write(&path, RESULTS).unwrap();
        path
    }

    #[test]
    fn test_baseline_columns_match_case_insensitively() -> Result<()> {
        let table = posgrid::table::parse_results(&RESULTS.replace("Majority_baseline", "majority_baseline"))?;
        assert!(has_row_baselines(&table));

        let without = posgrid::table::parse_results(
            "Corpus\tCues\tAccuracy\tEntropy\nmanchester\tdiphones\t0.6\t0.5\n",
        )?;
        assert!(!has_row_baselines(&without));
        Ok(())
    }

    #[test]
    fn test_cli_parse_minimal() {
        let parsed = cli(&["results.tsv"]);
        assert_eq!(parsed.results, PathBuf::from("results.tsv"));
        assert!(parsed.filter.is_none());
        assert!(parsed.list_mode());
    }

    #[test]
    fn test_cli_parse_modes() {
        let parsed = cli(&["r.tsv", "--summary", "-m", "entr", "--plot", "grid.svg", "--width", "900"]);
        assert!(parsed.summary);
        assert_eq!(parsed.metric, Some(Metric::Entropy));
        assert_eq!(parsed.plot, Some(PathBuf::from("grid.svg")));
        assert_eq!(parsed.width, Some(900));
        assert!(!parsed.list_mode());

        assert!(cli(&["r.tsv", "--summary", "--list"]).list_mode());
    }

    #[test]
    fn test_cli_filter_conflicts_with_no_filter() {
        let result = Cli::try_parse_from(["posgrid", "r.tsv", "-f", "K > 1", "--no-filter"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_rejects_unknown_metric() {
        assert!(Cli::try_parse_from(["posgrid", "r.tsv", "-m", "recall"]).is_err());
    }

    #[test]
    fn test_run_lists_filtered_rows() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = results_file(dir.path());
        let path_str = path.to_string_lossy().to_string();

        let output = run(&cli(&[&path_str, "-f", "acc_St.diff > 0", "--no-color"]))?;
        assert!(output.contains("diphones"));
        assert!(!output.contains("triphones"));
        assert!(output.contains("2 row(s)"));
        Ok(())
    }

    #[test]
    fn test_run_summary_and_export() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = results_file(dir.path());
        let export = dir.path().join("out.tsv");
        let json = dir.path().join("out.json");

        let output = run(&cli(&[
            &path.to_string_lossy(),
            "--summary",
            "-m",
            "acc",
            "--export",
            &export.to_string_lossy(),
            "--json",
            &json.to_string_lossy(),
            "--no-color",
        ]))?;

        assert!(output.contains("acc_St.diff (3 rows)"));
        assert!(!output.contains("entr_St.diff (3 rows)"));
        // No --list alongside other outputs
        assert!(!output.contains("row(s)"));

        let exported = std::fs::read_to_string(&export)?;
        assert!(exported.lines().next().unwrap_or_default().contains("acc_St.diff"));
        assert_eq!(exported.lines().count(), 4);
        assert!(std::fs::read_to_string(&json)?.contains("\"acc_St.diff\""));
        Ok(())
    }

    #[test]
    fn test_run_uses_discovered_config_filter() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = results_file(dir.path());
        std::fs::write(dir.path().join("posgrid.toml"), "filter = 'Cues == \"triphones\"'\n")?;

        let output = run(&cli(&[&path.to_string_lossy(), "--no-color"]))?;
        assert!(output.contains("1 row(s)"));

        let output = run(&cli(&[&path.to_string_lossy(), "--no-color", "--no-filter"]))?;
        assert!(output.contains("3 row(s)"));
        Ok(())
    }

    #[test]
    fn test_run_reports_bad_filter() {
        let dir = tempfile::tempdir().unwrap();
        let path = results_file(dir.path());
        let err = run(&cli(&[&path.to_string_lossy(), "-f", "acc_St.diff >"])).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid filter"));
    }
}
