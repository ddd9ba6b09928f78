//! Configuration loading from posgrid.toml.
//!
//! Looked up next to the results table, then in each parent directory, so a
//! single file at the root of an experiment folder covers every run below it.
//!
//! ## Example
//!
//! ```toml
//! filter = "acc_St.diff > 0 and -0.25 < entr_St.diff < 0.25"
//!
//! [baselines.manchester]
//! accuracy = 0.31
//! entropy = 0.78
//!
//! [plot]
//! width = 1600
//! faded-alpha = 0.15
//!
//! [layout.x.Cues]
//! uniphones = 0.0
//! diphones = 10.0
//!
//! [layout.y.K]
//! step = 1.0
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use crate::analysis::baselines::{Baseline, BaselineTable};
use crate::layout::{Axis, Layout, offsets_from_table};
use crate::rendering::plots::PlotOptions;
use crate::types::Factor;

pub const CONFIG_FILE: &str = "posgrid.toml";

/// posgrid configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Source file for this config (for display).
    pub source: Option<PathBuf>,

    /// Default row filter, overridable from the command line.
    pub filter: Option<String>,

    /// Per-corpus baselines for tables without baseline columns.
    pub baselines: BaselineTable,

    pub plot: PlotOptions,

    pub layout: Layout,
}

/// Raw config as deserialized from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawConfig {
    filter: Option<String>,
    #[serde(default)]
    baselines: BTreeMap<String, Baseline>,
    #[serde(default)]
    plot: PlotOptions,
    #[serde(default)]
    layout: RawLayout,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawLayout {
    #[serde(default)]
    x: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default)]
    y: BTreeMap<String, BTreeMap<String, f64>>,
}

impl Config {
    /// Discover configuration starting at `directory`.
    ///
    /// Search order:
    /// 1. posgrid.toml in directory
    /// 2. posgrid.toml in each parent directory
    /// 3. Default config if nothing found
    ///
    /// A file that exists but fails to parse is an error, not a silent default.
    pub fn load(directory: &Path) -> Result<Self> {
        let mut current = Some(directory);
        while let Some(dir) = current {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                return Self::load_file(&candidate);
            }
            current = dir.parent();
        }
        Ok(Self::default())
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config '{}'", path.display()))?;
        Self::parse(&content, Some(path.to_path_buf()))
            .with_context(|| format!("Invalid config '{}'", path.display()))
    }

    pub fn parse(content: &str, source: Option<PathBuf>) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;
        Self::from_raw(raw, source)
    }

    fn from_raw(raw: RawConfig, source: Option<PathBuf>) -> Result<Self> {
        let mut layout = Layout::default();
        for (axis, entries) in [(Axis::X, &raw.layout.x), (Axis::Y, &raw.layout.y)] {
            // Entries not already on the axis are appended in factor order
            let mut resolved = Vec::new();
            for (name, table) in entries {
                let factor: Factor = name
                    .parse()
                    .map_err(|e: String| anyhow!("layout.{}: {}", axis.name(), e))?;
                resolved.push((factor, offsets_from_table(factor, table)?));
            }
            resolved.sort_by_key(|(factor, _)| *factor);
            for (_, entry) in resolved {
                layout.set(axis, entry);
            }
        }

        let filter = raw.filter.filter(|f| !f.trim().is_empty());

        Ok(Self {
            source,
            filter,
            baselines: raw.baselines.into_iter().collect(),
            plot: raw.plot,
            layout,
        })
    }

    /// Format config for verbose display.
    pub fn display_summary(&self) -> String {
        let mut lines = Vec::new();

        if let Some(ref source) = self.source {
            lines.push(format!("   Config: {}", source.display()));
        } else {
            lines.push("   Config: (defaults)".to_string());
        }

        if let Some(ref filter) = self.filter {
            lines.push(format!("   Filter: {}", filter));
        }

        if !self.baselines.is_empty() {
            let corpora: Vec<&str> = self.baselines.iter().map(|(c, _)| c.as_str()).collect();
            lines.push(format!("   Baselines: {}", corpora.join(", ")));
        }

        let axis = |entries: &[crate::layout::FactorOffsets]| {
            entries
                .iter()
                .map(|e| e.factor.column())
                .collect::<Vec<_>>()
                .join(" / ")
        };
        lines.push(format!("   Layout: X = {}; Y = {}", axis(&self.layout.x), axis(&self.layout.y)));

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{FactorOffsets, Offsets};
    use crate::types::Metric;

    const SAMPLE: &str = r#"
filter = "acc_St.diff > 0"

[baselines.manchester]
accuracy = 0.31
entropy = 0.78

[plot]
width = 800
faded-alpha = 0.1

[layout.x.Cues]
uniphones = 0.0
diphones = 10.0

[layout.y.K]
step = 1.0

[layout.y.Boundaries]
yes = 0.0
no = 0.1
"#;

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(SAMPLE, None).unwrap();
        assert_eq!(config.filter.as_deref(), Some("acc_St.diff > 0"));

        let manchester = config.baselines.get("manchester").unwrap();
        assert_eq!(manchester.get(Metric::Entropy), 0.78);

        assert_eq!(config.plot.width, 800);
        assert_eq!(config.plot.height, PlotOptions::default().height);
        assert!((config.plot.faded_alpha - 0.1).abs() < 1e-12);

        // Cues replaced in place, still the coarsest x factor
        assert_eq!(config.layout.x[0].factor, Factor::Cues);
        assert!(matches!(config.layout.x[0].offsets, Offsets::Explicit(ref v) if v.len() == 2));

        // K replaced in place, Boundaries appended as finest
        let k = config.layout.y.iter().find(|e| e.factor == Factor::K).unwrap();
        assert_eq!(*k, FactorOffsets::ordinal(Factor::K, 1.0));
        assert_eq!(config.layout.y.last().map(|e| e.factor), Some(Factor::Boundaries));
    }

    #[test]
    fn test_unknown_keys_and_factors_rejected() {
        assert!(Config::parse("colour = 1", None).is_err());
        let err = Config::parse("[layout.x.Colour]\nred = 1.0\n", None).unwrap_err();
        assert!(format!("{:#}", err).contains("Colour"));
    }

    #[test]
    fn test_empty_filter_ignored() {
        let config = Config::parse("filter = \"  \"", None).unwrap();
        assert!(config.filter.is_none());
    }

    #[test]
    fn test_load_walks_up_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("runs").join("2017");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), SAMPLE).unwrap();

        let config = Config::load(&nested).unwrap();
        assert_eq!(config.source.as_deref(), Some(dir.path().join(CONFIG_FILE).as_path()));
        assert!(config.display_summary().contains("manchester"));
    }

    #[test]
    fn test_load_without_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        // May still find a posgrid.toml above the temp dir on odd machines;
        // only check that discovery does not fail.
        assert!(Config::load(dir.path()).is_ok());
        assert!(Config::default().display_summary().contains("(defaults)"));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "filter = [").unwrap();
        assert!(Config::load(dir.path()).is_err());
    }
}
