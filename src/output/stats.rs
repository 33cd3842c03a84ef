//! Statistics generation from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! harvest statistics from the storage layer.

use crate::storage::{OutcomeKind, RunRecord, SourceSummary, Storage};
use crate::HarvestError;
use std::collections::HashMap;

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Number of recorded runs
    pub total_runs: u64,

    /// Posts stored across all sources
    pub total_posts: u64,

    /// Sources holding a checkpoint
    pub sources_with_checkpoint: u64,

    /// Per-source post counts and checkpoints
    pub sources: Vec<SourceSummary>,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,

    /// Outcome breakdown of the most recent run
    pub latest_outcomes: HashMap<OutcomeKind, u64>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(HarvestStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<HarvestStatistics, HarvestError> {
    let latest_run = storage.get_latest_run()?;
    let latest_outcomes = match &latest_run {
        Some(run) => storage.get_outcome_counts(run.id)?,
        None => HashMap::new(),
    };

    Ok(HarvestStatistics {
        total_runs: storage.count_runs()?,
        total_posts: storage.count_posts()?,
        sources_with_checkpoint: storage.count_checkpoints()?,
        sources: storage.get_source_summaries()?,
        latest_run,
        latest_outcomes,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Runs recorded: {}", stats.total_runs);
    println!("  Posts stored: {}", stats.total_posts);
    println!("  Sources with checkpoint: {}", stats.sources_with_checkpoint);
    println!();

    if let Some(run) = &stats.latest_run {
        println!("Latest Run (#{}):", run.id);
        println!("  Started: {}", run.started_at);
        println!(
            "  Finished: {}",
            run.finished_at.as_deref().unwrap_or("not finished")
        );
        println!("  Status: {}", run.status.to_db_string());

        let mut outcome_counts: Vec<_> = stats.latest_outcomes.iter().collect();
        outcome_counts.sort();
        for (outcome, count) in outcome_counts {
            println!("  {}: {}", outcome.to_db_string(), count);
        }
        println!();
    }

    if !stats.sources.is_empty() {
        println!("Sources ({}):", stats.sources.len());
        for summary in &stats.sources {
            println!(
                "  {}: {} posts, checkpoint {}",
                summary.source,
                summary.posts,
                summary.checkpoint.as_deref().unwrap_or("none")
            );
        }
    }
}
