//! Report generation for benchmark results
//!
//! - [`console`]: human-readable configuration banner and run summary
//! - [`JsonExporter`]: machine-readable summary file

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod console;
pub mod json_export;

pub use console::{print_banner, print_summary, render_banner, render_summary};
pub use json_export::{JsonExporter, ReportError};
