//! Output formatters for run summaries and index reports.
//!
//! - Text for terminals (colored with yansi)
//! - JSON for automation and scripting

pub mod json;
pub mod text;

pub use json::{JsonIndexReport, JsonOutputError, JsonRunOutput};
pub use text::{write_benchmark, write_index_report, write_run_summary};
