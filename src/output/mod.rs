//! Output module for harvest reports and database statistics
//!
//! This module handles:
//! - Printing the report of a finished harvest run
//! - Reading and printing statistics from an existing database

pub mod stats;

pub use stats::{load_statistics, print_statistics, HarvestStatistics};

use crate::crawler::{CrawlOutcome, HarvestReport};

/// Prints the report of a harvest run to stdout
///
/// Failed sources are listed with their reason so they can be retried with
/// `--source`.
pub fn print_report(report: &HarvestReport) {
    println!("=== Harvest Run #{} ===\n", report.run_id);

    println!("Sources: {}", report.outcomes.len());
    println!("  Committed: {}", report.committed());
    println!("  Up to date: {}", report.up_to_date());
    println!("  Failed: {}", report.failed());
    println!("Posts committed: {}", report.items_committed());
    println!("Elapsed: {:.1}s", report.elapsed.as_secs_f64());

    let failures = failed_sources(report);
    if !failures.is_empty() {
        println!("\nFailed Sources ({}):", failures.len());
        for (source, reason) in failures {
            println!("  - {}: {}", source, reason);
        }
    }
}

/// Failed sources of a report with their reasons, in crawl order
pub fn failed_sources(report: &HarvestReport) -> Vec<(String, String)> {
    report
        .outcomes
        .iter()
        .filter_map(|(source, outcome)| match outcome {
            CrawlOutcome::Failed(reason) => Some((source.to_string(), reason.clone())),
            _ => None,
        })
        .collect()
}
