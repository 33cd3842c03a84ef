//! Harvest coordinator
//!
//! This module contains the orchestrator that ties everything together:
//! - Reading each source's checkpoint before its crawl
//! - The page-1 freshness check that skips sources with nothing new
//! - Handing the crawl to the pagination scheduler and the merge stage
//! - Committing the new suffix and recording per-source outcomes
//!
//! Sources are crawled one after another. A source that fails is logged,
//! recorded and skipped; it never stops the run and never touches its
//! checkpoint.

use crate::board::{Board, IdentityKind, Source, SourceDirectory};
use crate::config::Config;
use crate::crawler::directory::{ListedCompanyDirectory, StaticDirectory};
use crate::crawler::fetcher::build_http_client;
use crate::crawler::merge::merge;
use crate::crawler::naver::NaverBoard;
use crate::crawler::scheduler::PaginationScheduler;
use crate::storage::{open_storage, OutcomeKind, RunStatus, Storage};
use crate::HarvestError;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How the crawl of one source ended
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlOutcome {
    /// Nothing newer than the checkpoint was found
    UpToDate,

    /// New posts were committed and the checkpoint moved forward
    Committed { items: usize, elapsed: Duration },

    /// The source was abandoned; storage was left untouched
    Failed(String),
}

impl CrawlOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::UpToDate => OutcomeKind::UpToDate,
            Self::Committed { .. } => OutcomeKind::Committed,
            Self::Failed(_) => OutcomeKind::Failed,
        }
    }

    pub fn items(&self) -> usize {
        match self {
            Self::Committed { items, .. } => *items,
            _ => 0,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for CrawlOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpToDate => write!(f, "up to date"),
            Self::Committed { items, elapsed } => {
                write!(f, "{} posts committed in {:.2}s", items, elapsed.as_secs_f64())
            }
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Totals of one harvest run
#[derive(Debug, Clone, Default)]
pub struct HarvestReport {
    pub run_id: i64,
    pub outcomes: Vec<(Source, CrawlOutcome)>,
    pub elapsed: Duration,
}

impl HarvestReport {
    pub fn up_to_date(&self) -> usize {
        self.count(OutcomeKind::UpToDate)
    }

    pub fn committed(&self) -> usize {
        self.count(OutcomeKind::Committed)
    }

    pub fn failed(&self) -> usize {
        self.count(OutcomeKind::Failed)
    }

    /// Posts committed across every source
    pub fn items_committed(&self) -> usize {
        self.outcomes.iter().map(|(_, outcome)| outcome.items()).sum()
    }

    fn count(&self, kind: OutcomeKind) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.kind() == kind)
            .count()
    }
}

/// Orchestrates incremental crawls of many sources into one store
pub struct Harvester<S: Storage> {
    board: Arc<dyn Board>,
    storage: S,
    scheduler: PaginationScheduler,
    identity: IdentityKind,
    run_id: Option<i64>,
}

impl<S: Storage> Harvester<S> {
    /// Creates a harvester
    ///
    /// # Arguments
    ///
    /// * `board` - Where listings and posts come from
    /// * `storage` - Checkpoint store the posts are committed to
    /// * `scheduler` - Page and item pool sizes
    /// * `identity` - Identity kind used for checkpoints and ordering
    pub fn new(
        board: Arc<dyn Board>,
        storage: S,
        scheduler: PaginationScheduler,
        identity: IdentityKind,
    ) -> Self {
        Self {
            board,
            storage,
            scheduler,
            identity,
            run_id: None,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Crawls one source and commits what is new
    ///
    /// Errors of any stage are returned as `CrawlOutcome::Failed`.
    pub async fn harvest_source(&mut self, source: &Source) -> CrawlOutcome {
        match self.crawl_source(source).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("{}: abandoned: {}", source, e);
                CrawlOutcome::Failed(e.to_string())
            }
        }
    }

    async fn crawl_source(&mut self, source: &Source) -> Result<CrawlOutcome, HarvestError> {
        let started = Instant::now();
        let checkpoint = self.storage.latest_checkpoint(source, self.identity)?;

        let first = self.board.listing(source, 1).await?;
        if first.entries.is_empty() {
            tracing::debug!("{}: board is empty", source);
            return Ok(CrawlOutcome::UpToDate);
        }

        // Maximum rather than first row: replies are not listed at the top
        if let Some(newest) = first.newest_identity(self.identity) {
            if checkpoint.covers(&newest) {
                tracing::debug!("{}: newest listed {} is already stored", source, newest);
                return Ok(CrawlOutcome::UpToDate);
            }
        }

        let page_count = first.last_page.max(1);
        tracing::debug!(
            "{}: {} pages, checkpoint {}",
            source,
            page_count,
            checkpoint
                .latest
                .map(|latest| latest.to_string())
                .unwrap_or_else(|| "none".to_string())
        );

        let pages = self
            .scheduler
            .crawl_source(Arc::clone(&self.board), source, page_count, checkpoint)
            .await?;
        let merged = merge(pages, self.identity)?;

        let fresh: Vec<_> = merged
            .into_iter()
            .filter(|entry| !checkpoint.covers(&entry.identity(self.identity)))
            .collect();

        let summary = self
            .storage
            .commit(source, self.identity, &fresh, self.run_id)?;

        if summary.committed == 0 {
            return Ok(CrawlOutcome::UpToDate);
        }

        Ok(CrawlOutcome::Committed {
            items: summary.committed,
            elapsed: started.elapsed(),
        })
    }

    /// Harvests every source in order within one recorded run
    ///
    /// Per-source failures are part of the report. Only storage failures while
    /// bookkeeping the run itself end it early; the run is then marked failed.
    pub async fn harvest(
        &mut self,
        sources: &[Source],
        config_hash: &str,
    ) -> Result<HarvestReport, HarvestError> {
        let run_id = self.storage.create_run(config_hash)?;
        self.run_id = Some(run_id);
        tracing::info!("Starting harvest run {} over {} sources", run_id, sources.len());

        let started = Instant::now();
        let mut report = HarvestReport {
            run_id,
            ..Default::default()
        };

        for (index, source) in sources.iter().enumerate() {
            let outcome = self.harvest_source(source).await;
            tracing::info!("[{}/{}] {}: {}", index + 1, sources.len(), source, outcome);

            let detail = match &outcome {
                CrawlOutcome::Failed(reason) => Some(reason.as_str()),
                _ => None,
            };
            if let Err(e) =
                self.storage
                    .record_outcome(run_id, source, outcome.kind(), outcome.items(), detail)
            {
                self.abort_run(run_id);
                return Err(e.into());
            }

            report.outcomes.push((source.clone(), outcome));
        }

        report.elapsed = started.elapsed();
        self.storage.finish_run(run_id, RunStatus::Completed)?;
        self.run_id = None;

        tracing::info!(
            "Harvest run {} finished: {} committed, {} up to date, {} failed, {} posts",
            run_id,
            report.committed(),
            report.up_to_date(),
            report.failed(),
            report.items_committed()
        );

        Ok(report)
    }

    fn abort_run(&mut self, run_id: i64) {
        if let Err(e) = self.storage.finish_run(run_id, RunStatus::Failed) {
            tracing::error!("Could not mark run {} as failed: {}", run_id, e);
        }
        self.run_id = None;
    }
}

/// Resolves which sources a run covers
///
/// Explicit sources win over the configured list; with neither, the
/// listed-company table is downloaded.
pub async fn resolve_sources(
    config: &Config,
    explicit: Vec<Source>,
    client: reqwest::Client,
) -> Result<Vec<Source>, HarvestError> {
    let directory: Box<dyn SourceDirectory> = if !explicit.is_empty() {
        Box::new(StaticDirectory::new(explicit))
    } else if !config.sources.codes.is_empty() {
        Box::new(StaticDirectory::new(config.sources.to_sources()))
    } else {
        Box::new(ListedCompanyDirectory::new(client, &config.origin)?)
    };

    Ok(directory.list_sources().await?)
}

/// Runs a complete harvest
///
/// This function wires the production pieces together:
///
/// 1. Build the HTTP client from the user agent and timeouts
/// 2. Resolve the sources to crawl
/// 3. Open storage
/// 4. Crawl every source and commit what is new
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `config_hash` - Hash of the configuration file, stored with the run
/// * `explicit` - Sources named on the command line; may be empty
///
/// # Returns
///
/// * `Ok(HarvestReport)` - The run completed (individual sources may have failed)
/// * `Err(HarvestError)` - The run could not start or its bookkeeping failed
///
/// # Example
///
/// ```no_run
/// use board_harvest::config::load_config_with_hash;
/// use board_harvest::crawler::run_harvest;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("config.toml"))?;
/// let report = run_harvest(&config, &hash, vec![]).await?;
/// println!("{} posts committed", report.items_committed());
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(
    config: &Config,
    config_hash: &str,
    explicit: Vec<Source>,
) -> Result<HarvestReport, HarvestError> {
    let client = build_http_client(&config.user_agent, &config.crawler)?;
    let board: Arc<dyn Board> = Arc::new(NaverBoard::new(client.clone(), &config.origin)?);
    let sources = resolve_sources(config, explicit, client).await?;

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let mut harvester = Harvester::new(
        board,
        storage,
        PaginationScheduler::from_config(&config.crawler),
        config.crawler.identity,
    );

    harvester.harvest(&sources, config_hash).await
}
