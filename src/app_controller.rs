use std::time::Duration;

use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};

use crate::app_config::Config;
use crate::broker::JobQueue;
use crate::engine::{self, DocumentOutcome, TranslationJob};
use crate::errors::{EngineError, StoreError};
use crate::interpreters::{Interpreter, create_interpreter};
use crate::store::{DocumentStore, ElasticStore, ScanParams};

/// Application controller for translation runs
///
/// Owns the scan/dispatch orchestration: counts matching documents,
/// walks the paged scan, and either processes documents on a local
/// worker pool (immediate mode) or serializes them onto the broker
/// queue (planned mode).
pub struct Controller {
    config: Config,
}

/// Aggregate counts for one run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Documents seen by the scan
    pub scanned: u64,
    /// Documents committed (or that would be, under dry-run)
    pub translated: u64,
    /// Committed documents where force replaced an existing record
    pub replaced: u64,
    /// Documents skipped (already translated, or empty source)
    pub skipped: u64,
    /// Per-document failures (pair unavailable, backend error, write error)
    pub failed: u64,
    /// Jobs enqueued (planned mode only)
    pub planned: u64,
}

impl Controller {
    /// Build a controller with a validated configuration
    pub fn new(config: Config) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Run a translation pass using the configured store and backend
    pub async fn run(&self) -> Result<RunSummary, EngineError> {
        let store = ElasticStore::new(&self.config.url, &self.config.index);

        if self.config.plan {
            let queue = JobQueue::connect(&self.config.broker_url)?;
            self.run_planned(&store, &queue).await
        } else {
            let interpreter = create_interpreter(&self.config)?;
            self.run_immediate(&store, interpreter.as_ref()).await
        }
    }

    /// Immediate mode: translate scanned documents on a local pool of
    /// `pool_size` concurrent jobs.
    pub async fn run_immediate(
        &self,
        store: &dyn DocumentStore,
        interpreter: &dyn Interpreter,
    ) -> Result<RunSummary, EngineError> {
        let config = &self.config;
        let pair = config.pair()?;
        let total = store.count(config.query_string.as_deref()).await?;

        info!(
            "Translating {} document(s) in {} from {} to {} with {}",
            total, config.index, pair.source_name()?, pair.target_name()?, config.backend
        );
        if config.dry_run {
            info!("Dry-run: no document will be written");
        }

        let progress = self.build_progress(total);
        let mut summary = RunSummary::default();
        let mut restarted = false;

        'scan: loop {
            let params = ScanParams::from_config(config, false)?;
            let mut cursor = store.start_scan(&params).await?;

            loop {
                let page = match cursor.next_page().await {
                    Ok(page) => page,
                    Err(StoreError::CursorExpired(reason)) if !restarted => {
                        // One full restart; re-processing already-committed
                        // documents degenerates to skips
                        warn!("Scan cursor expired (lease {}s), restarting scan", reason);
                        restarted = true;
                        summary = RunSummary::default();
                        progress.set_position(0);
                        continue 'scan;
                    }
                    Err(e) => return Err(e.into()),
                };
                if page.is_empty() {
                    break 'scan;
                }

                let outcomes = futures::stream::iter(page.into_iter().map(|snapshot| {
                    let throttle = config.throttle();
                    async move {
                        let result = tokio::time::timeout(
                            config.job_timeout(),
                            engine::process_snapshot(store, interpreter, config, &snapshot),
                        )
                        .await;
                        let outcome = match result {
                            Ok(outcome) => outcome,
                            Err(_) => Ok(DocumentOutcome::timed_out(config.pool_timeout_secs)),
                        };
                        if throttle > Duration::ZERO {
                            tokio::time::sleep(throttle).await;
                        }
                        (snapshot.id, outcome)
                    }
                }))
                .buffer_unordered(config.pool_size.max(1))
                .collect::<Vec<_>>()
                .await;

                for (doc_id, outcome) in outcomes {
                    progress.inc(1);
                    summary.scanned += 1;
                    self.record_outcome(&doc_id, outcome?, &mut summary);
                }
            }
        }

        progress.finish_and_clear();
        info!(
            "Translated {} of {} scanned document(s) ({} skipped, {} failed)",
            summary.translated, summary.scanned, summary.skipped, summary.failed
        );
        Ok(summary)
    }

    /// Planned mode: serialize one job per scanned document onto the
    /// broker queue for later consumption by workers.
    pub async fn run_planned(
        &self,
        store: &dyn DocumentStore,
        queue: &JobQueue,
    ) -> Result<RunSummary, EngineError> {
        let config = &self.config;
        let total = store.count(config.query_string.as_deref()).await?;
        info!("Planning {} document(s) onto queue {}", total, config.broker_url);

        let progress = self.build_progress(total);
        let mut summary = RunSummary::default();
        let mut restarted = false;

        'scan: loop {
            let params = ScanParams::from_config(config, true)?;
            let mut cursor = store.start_scan(&params).await?;

            loop {
                let page = match cursor.next_page().await {
                    Ok(page) => page,
                    Err(StoreError::CursorExpired(reason)) if !restarted => {
                        // Duplicate jobs from the restart are replay-safe
                        warn!("Scan cursor expired (lease {}s), restarting scan", reason);
                        restarted = true;
                        summary = RunSummary::default();
                        progress.set_position(0);
                        continue 'scan;
                    }
                    Err(e) => return Err(e.into()),
                };
                if page.is_empty() {
                    break 'scan;
                }

                for snapshot in page {
                    let job = TranslationJob::new(config, &snapshot);
                    queue.enqueue(&job).await?;
                    info!("Planned translation for doc {}", snapshot.id);
                    progress.inc(1);
                    summary.scanned += 1;
                    summary.planned += 1;
                }
            }
        }

        progress.finish_and_clear();
        info!("Planned {} job(s)", summary.planned);
        Ok(summary)
    }

    fn build_progress(&self, total: u64) -> ProgressBar {
        if !self.config.progressbar {
            return ProgressBar::hidden();
        }
        let progress = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} docs ({percent}%) {eta}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress.set_style(style);
        progress
    }

    fn record_outcome(&self, doc_id: &str, outcome: DocumentOutcome, summary: &mut RunSummary) {
        match &outcome {
            DocumentOutcome::Committed { replaced } => {
                summary.translated += 1;
                if *replaced {
                    summary.replaced += 1;
                    info!("Doc {}: committed (replaced existing record)", doc_id);
                } else {
                    info!("Doc {}: committed", doc_id);
                }
            }
            DocumentOutcome::WouldCommit => {
                summary.translated += 1;
                info!("Doc {}: would commit (dry-run)", doc_id);
            }
            DocumentOutcome::SkippedAlreadyTranslated => {
                summary.skipped += 1;
                debug!("Doc {}: already translated, skipping", doc_id);
            }
            DocumentOutcome::SkippedEmptySource => {
                summary.skipped += 1;
                debug!("Doc {}: empty source field, skipping", doc_id);
            }
            DocumentOutcome::PairUnavailable(reason)
            | DocumentOutcome::TranslationFailed(reason)
            | DocumentOutcome::WriteFailed(reason) => {
                summary.failed += 1;
                warn!("Doc {}: {}: {}", doc_id, outcome.label(), reason);
            }
        }
    }
}
