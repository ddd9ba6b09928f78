//! Placement of grid configurations on two synthetic axes.

pub mod coordinates;

pub use coordinates::{Axis, FactorOffsets, FittedLayout, Layout, Offsets, offsets_from_table};
