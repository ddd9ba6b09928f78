//! Synthetic plot coordinates for a categorical grid.
//!
//! The grid has no natural geometry, so each configuration is placed by
//! summing per-level offsets: `X = Σ x-offsets`, `Y = Σ y-offsets`. Factors
//! are nested from coarse to fine along each axis. The first factor on an
//! axis lays out big blocks, later factors shift points within a block:
//!
//! ```text
//!  X:  | uniphones          | diphones           | ...
//!      | freq      | sum    | freq      | sum    |
//!      | count distr        | count distr        |
//! ```
//!
//! Offsets are either explicit (`level → offset`) or ordinal (levels sorted,
//! the i-th level at `i * step`), which suits K and flush.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Result, anyhow, bail};

use crate::analysis::summary::varying_factors;
use crate::types::{DerivedRow, Factor, ResultRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Offsets {
    Explicit(Vec<(String, f64)>),
    Ordinal { step: f64 },
}

/// Offsets of one factor along one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorOffsets {
    pub factor: Factor,
    pub offsets: Offsets,
}

impl FactorOffsets {
    pub fn explicit(factor: Factor, levels: &[(&str, f64)]) -> Self {
        Self {
            factor,
            offsets: Offsets::Explicit(levels.iter().map(|(l, v)| (l.to_string(), *v)).collect()),
        }
    }

    pub fn ordinal(factor: Factor, step: f64) -> Self {
        Self {
            factor,
            offsets: Offsets::Ordinal { step },
        }
    }
}

/// Unfitted layout: which factors go on which axis, coarse to fine.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub x: Vec<FactorOffsets>,
    pub y: Vec<FactorOffsets>,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            x: vec![
                FactorOffsets::explicit(
                    Factor::Cues,
                    &[("uniphones", 0.0), ("diphones", 12.0), ("triphones", 24.0), ("syllables", 36.0)],
                ),
                FactorOffsets::explicit(Factor::Method, &[("freq", 0.0), ("sum", 6.0)]),
                FactorOffsets::explicit(Factor::Evaluation, &[("count", 0.0), ("distr", 3.0)]),
            ],
            y: vec![
                FactorOffsets::explicit(Factor::Vowels, &[("full", 0.0), ("reduced", 20.0)]),
                FactorOffsets::explicit(Factor::Stress, &[("no-stress", 0.0), ("stress", 10.0)]),
                FactorOffsets::ordinal(Factor::K, 2.0),
                FactorOffsets::ordinal(Factor::Flush, 0.3),
            ],
        }
    }
}

impl Layout {
    pub fn axis(&self, axis: Axis) -> &[FactorOffsets] {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
        }
    }

    fn axis_mut(&mut self, axis: Axis) -> &mut Vec<FactorOffsets> {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
        }
    }

    /// Replace the entry for the same factor on this axis, or append it as
    /// the finest factor. A factor lives on one axis only, so any entry for
    /// it on the other axis is dropped.
    pub fn set(&mut self, axis: Axis, entry: FactorOffsets) {
        let other = match axis {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        };
        self.axis_mut(other).retain(|e| e.factor != entry.factor);

        let list = self.axis_mut(axis);
        match list.iter_mut().find(|e| e.factor == entry.factor) {
            Some(existing) => *existing = entry,
            None => list.push(entry),
        }
    }

    /// Resolve ordinal rules against the levels seen in `rows`. Factors whose
    /// column is absent (every level empty) are dropped from the axis, and
    /// explicit maps keep only the levels that occur.
    pub fn fit(&self, rows: &[DerivedRow]) -> Result<FittedLayout> {
        let x = fit_axis(&self.x, rows, Axis::X)?;
        let y = fit_axis(&self.y, rows, Axis::Y)?;

        // Corpus splits panels, so it never needs an axis
        let refs: Vec<&DerivedRow> = rows.iter().collect();
        let unplaced = varying_factors(&refs)
            .into_iter()
            .filter(|&f| f != Factor::Corpus)
            .filter(|&f| !x.iter().chain(&y).any(|fitted| fitted.factor == f))
            .collect();

        Ok(FittedLayout { x, y, unplaced })
    }

    /// Fit, validate, and write coordinates into every row.
    pub fn place(&self, rows: &mut [DerivedRow]) -> Result<FittedLayout> {
        let fitted = self.fit(rows)?;
        fitted.validate().map_err(|e| anyhow!("invalid layout: {}", e))?;
        for row in rows.iter_mut() {
            let (x, y) = fitted.coordinates(&row.row)?;
            row.x = x;
            row.y = y;
        }
        Ok(fitted)
    }
}

fn fit_axis(entries: &[FactorOffsets], rows: &[DerivedRow], axis: Axis) -> Result<Vec<FittedFactor>> {
    let mut fitted = Vec::new();

    for entry in entries {
        let observed: BTreeSet<&str> = rows.iter().map(|r| r.level(entry.factor)).collect();
        if observed.iter().all(|l| l.is_empty()) {
            continue;
        }

        let offsets: Vec<(String, f64)> = match &entry.offsets {
            Offsets::Explicit(map) => {
                let unknown: Vec<&str> = observed
                    .iter()
                    .copied()
                    .filter(|l| !map.iter().any(|(k, _)| k == l))
                    .collect();
                if !unknown.is_empty() {
                    bail!(
                        "{} axis: no offset for {} level(s) {:?}",
                        axis.name(),
                        entry.factor,
                        unknown
                    );
                }
                map.iter()
                    .filter(|(level, _)| observed.contains(level.as_str()))
                    .cloned()
                    .collect()
            }
            Offsets::Ordinal { step } => {
                let mut levels: Vec<String> = observed.iter().map(|s| s.to_string()).collect();
                entry.factor.sort_levels(&mut levels);
                levels
                    .into_iter()
                    .enumerate()
                    .map(|(i, level)| (level, i as f64 * step))
                    .collect()
            }
        };
        let mut offsets = offsets;
        offsets.sort_by(|a, b| a.1.total_cmp(&b.1));

        fitted.push(FittedFactor {
            factor: entry.factor,
            offsets,
        });
    }

    Ok(fitted)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FittedFactor {
    pub factor: Factor,
    /// Sorted by offset
    pub offsets: Vec<(String, f64)>,
}

impl FittedFactor {
    fn offset(&self, level: &str) -> Option<f64> {
        self.offsets.iter().find(|(l, _)| l == level).map(|(_, v)| *v)
    }

    fn bounds(&self) -> (f64, f64) {
        let min = self.offsets.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
        let max = self.offsets.iter().map(|(_, v)| *v).fold(f64::NEG_INFINITY, f64::max);
        if min.is_finite() && max.is_finite() { (min, max) } else { (0.0, 0.0) }
    }

    fn span(&self) -> f64 {
        let (min, max) = self.bounds();
        max - min
    }

    /// Smallest gap between distinct offsets (infinite with fewer than two).
    fn min_gap(&self) -> f64 {
        let mut values: Vec<f64> = self.offsets.iter().map(|(_, v)| *v).collect();
        values.sort_by(|a, b| a.total_cmp(b));
        values
            .windows(2)
            .map(|w| w[1] - w[0])
            .fold(f64::INFINITY, f64::min)
    }
}

/// A layout with every offset resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedLayout {
    pub x: Vec<FittedFactor>,
    pub y: Vec<FittedFactor>,
    /// Factors that vary across rows but sit on neither axis. Rows differing
    /// only in these share a point.
    pub unplaced: Vec<Factor>,
}

impl FittedLayout {
    pub fn axis(&self, axis: Axis) -> &[FittedFactor] {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
        }
    }

    pub fn coordinates(&self, row: &ResultRow) -> Result<(f64, f64)> {
        Ok((self.sum(Axis::X, row)?, self.sum(Axis::Y, row)?))
    }

    fn sum(&self, axis: Axis, row: &ResultRow) -> Result<f64> {
        let mut total = 0.0;
        for factor in self.axis(axis) {
            let level = row.level(factor.factor);
            total += factor.offset(level).ok_or_else(|| {
                anyhow!(
                    "line {}: {} level '{}' has no {} offset",
                    row.line,
                    factor.factor,
                    level,
                    axis.name()
                )
            })?;
        }
        Ok(total)
    }

    /// Offsets must be finite, and the finer factors after each factor must
    /// span less than that factor's smallest gap so no two configurations
    /// land on the same point.
    pub fn validate(&self) -> Result<(), String> {
        for axis in [Axis::X, Axis::Y] {
            let factors = self.axis(axis);

            for factor in factors {
                if let Some((level, value)) = factor.offsets.iter().find(|(_, v)| !v.is_finite()) {
                    return Err(format!(
                        "{} axis: {} level '{}' has non-finite offset {}",
                        axis.name(),
                        factor.factor,
                        level,
                        value
                    ));
                }
            }

            for (i, factor) in factors.iter().enumerate() {
                let finer = &factors[i + 1..];
                let finer_span: f64 = finer.iter().map(|f| f.span()).sum();
                let gap = factor.min_gap();
                if finer_span >= gap {
                    let names: Vec<&str> = finer.iter().map(|f| f.factor.column()).collect();
                    return Err(format!(
                        "{} axis: {} levels are {} apart but {} span {}",
                        axis.name(),
                        factor.factor,
                        gap,
                        names.join(", "),
                        finer_span
                    ));
                }
            }
        }
        Ok(())
    }

    /// Lowest and highest reachable coordinate on an axis.
    pub fn extent(&self, axis: Axis) -> (f64, f64) {
        self.axis(axis).iter().fold((0.0, 0.0), |(lo, hi), f| {
            let (min, max) = f.bounds();
            (lo + min, hi + max)
        })
    }

    /// Hint for [`FittedLayout::unplaced`], `None` when every varying factor has an axis.
    pub fn unplaced_warning(&self) -> Option<String> {
        if self.unplaced.is_empty() {
            return None;
        }
        let names: Vec<&str> = self.unplaced.iter().map(|f| f.column()).collect();
        Some(format!(
            "{} vary across rows but have no axis; those rows overlap in the plot (add [layout.x.{}] or [layout.y.{}] to posgrid.toml)",
            names.join(", "),
            names[0],
            names[0]
        ))
    }

    /// Block labels of the coarsest factor on an axis, at the block centre.
    pub fn tick_labels(&self, axis: Axis) -> Vec<(f64, String)> {
        let factors = self.axis(axis);
        let Some(first) = factors.first() else {
            return Vec::new();
        };
        let (lo, hi) = factors[1..].iter().fold((0.0, 0.0), |(lo, hi), f| {
            let (min, max) = f.bounds();
            (lo + min, hi + max)
        });
        first
            .offsets
            .iter()
            .map(|(level, v)| (v + (lo + hi) / 2.0, level.clone()))
            .collect()
    }

    /// "Cues / Method / Evaluation"
    pub fn description(&self, axis: Axis) -> String {
        let names: Vec<&str> = self.axis(axis).iter().map(|f| f.factor.column()).collect();
        names.join(" / ")
    }
}

/// Parse a `[layout.x.<Factor>]` table: either `{ step = n }` or `level = offset` pairs.
pub fn offsets_from_table(factor: Factor, table: &BTreeMap<String, f64>) -> Result<FactorOffsets> {
    if table.is_empty() {
        bail!("layout entry for {} is empty", factor);
    }
    if let Some(step) = table.get("step") {
        if table.len() > 1 {
            bail!("layout entry for {} mixes 'step' with explicit levels", factor);
        }
        return Ok(FactorOffsets::ordinal(factor, *step));
    }
    Ok(FactorOffsets {
        factor,
        offsets: Offsets::Explicit(table.iter().map(|(k, v)| (k.clone(), *v)).collect()),
    })
}
