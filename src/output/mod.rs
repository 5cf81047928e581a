//! Output module for reports and statistics
//!
//! This module handles:
//! - Writing the ranked `score url` report
//! - Loading and printing harvest statistics

mod report;
pub mod stats;

pub use report::{export_report, write_report};
pub use stats::{load_statistics, print_statistics, HarvestStatistics};
