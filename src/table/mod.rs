//! Results table I/O.

pub mod reader;
pub mod writer;

pub use reader::{ResultTable, parse_results, read_results};
pub use writer::{format_results, results_frame, to_json, write_json, write_results};
