//! Run controller - main fetch-and-persist orchestration
//!
//! This module contains the loop that drives a harvest run:
//! - Opening the ledger and output sinks (single writer per run)
//! - Reconciling the ledger with the output dataset at startup
//! - Skipping identifiers that completed in earlier runs (the resume path)
//! - Dispatching bounded concurrent fetches
//! - Routing each outcome to the result writer or the failure log
//! - Handling interrupts and clean shutdown
//!
//! The ledger and both output files are written only from this task, even
//! when fetches run concurrently; a fetch task touches nothing but the
//! network.

use crate::config::Config;
use crate::harvest::client::{build_http_client, fetch_product, FetchOutcome, FetchReport};
use crate::ledger::{Ledger, RunStatus, SqliteLedger};
use crate::output::{load_written_ids, FailureLog, TsvWriter};
use crate::source::load_identifiers;
use crate::Result;
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Identifiers in the (deduplicated) input list
    pub total_identifiers: usize,
    /// Skipped because the ledger already had a terminal state
    pub skipped: usize,
    /// Fetched and appended this run
    pub succeeded: usize,
    /// Permanently failed this run
    pub failed: usize,
    /// True if the run stopped on a shutdown signal before finishing
    pub interrupted: bool,
}

/// Main run controller structure
pub struct Controller {
    config: Arc<Config>,
    ledger: SqliteLedger,
    writer: TsvWriter,
    failures: FailureLog,
    client: Client,
    run_id: i64,
}

impl Controller {
    /// Creates a new controller instance
    ///
    /// Opens the ledger (failing fast if it is corrupt), opens both output
    /// sinks, reconciles the ledger against rows already present in the
    /// output dataset, and registers a new run. With `fresh` set, all
    /// previous state is discarded first.
    pub fn new(config: Config, config_hash: &str, fresh: bool) -> Result<Self> {
        let results_path = Path::new(&config.output.results_path).to_path_buf();
        let failure_log_path = Path::new(&config.output.failure_log_path).to_path_buf();

        if fresh {
            tracing::warn!("Fresh start requested: discarding ledger state and output files");
            TsvWriter::remove(&results_path)?;
            FailureLog::remove(&failure_log_path)?;
        }

        let mut ledger = SqliteLedger::new(Path::new(&config.output.ledger_path))?;
        if fresh {
            ledger.clear_products()?;
        }

        // A previous run that never finished shows up as still running
        if let Some(latest) = ledger.get_latest_run()? {
            if latest.status == RunStatus::Running {
                tracing::info!(
                    "Previous run {} did not finish cleanly; its completed work will be skipped",
                    latest.id
                );
                ledger.update_run_status(latest.id, RunStatus::Interrupted)?;
            }
        }
        let run_id = ledger.create_run(config_hash)?;

        // Replay the output's identifier column into the ledger before any
        // fetch: a row appended just before a crash may not have been marked
        // yet, and without this step it would be fetched and appended twice.
        let reconciled = reconcile_ledger(&mut ledger, &results_path, run_id)?;
        if reconciled > 0 {
            tracing::info!(
                "Reconciled {} output rows that were not yet marked in the ledger",
                reconciled
            );
        }

        let writer = TsvWriter::open(&results_path)?;
        let failures = FailureLog::open(&failure_log_path)?;
        let client = build_http_client(&config.api, &config.fetch)?;

        Ok(Self {
            config: Arc::new(config),
            ledger,
            writer,
            failures,
            client,
            run_id,
        })
    }

    /// Runs the harvest to completion (or until interrupted)
    ///
    /// Pulls identifiers from the input file, skips completed ones, and
    /// keeps up to `max_in_flight` fetches running. Each finished fetch is
    /// persisted (output first, ledger second) before its slot is reused.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let identifiers = load_identifiers(
            Path::new(&self.config.input.identifier_file),
            self.config.input.has_header,
        )?;

        tracing::info!(
            "Starting run {}: {} identifiers to consider",
            self.run_id,
            identifiers.len()
        );

        let mut summary = RunSummary {
            total_identifiers: identifiers.len(),
            ..RunSummary::default()
        };

        let max_in_flight = self.config.fetch.max_in_flight as usize;
        let mut tasks: JoinSet<(String, FetchReport)> = JoinSet::new();
        let mut queue = identifiers.into_iter();
        let mut stopping = false;
        let mut processed = 0usize;
        let started = Instant::now();

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            // Fill the in-flight window. Claiming before dispatch means no
            // two tasks can ever hold the same identifier.
            while !stopping && tasks.len() < max_in_flight {
                let Some(identifier) = queue.next() else {
                    break;
                };

                if self.ledger.is_completed(&identifier)? {
                    summary.skipped += 1;
                    continue;
                }
                self.ledger.claim(&identifier, self.run_id)?;

                let client = self.client.clone();
                let fetch_config = self.config.fetch.clone();
                let template = self.config.api.endpoint_template.clone();
                tasks.spawn(async move {
                    let report =
                        fetch_product(&client, &fetch_config, &template, &identifier).await;
                    (identifier, report)
                });
            }

            if tasks.is_empty() {
                break;
            }

            tokio::select! {
                _ = &mut shutdown, if !stopping => {
                    stopping = true;
                    tracing::info!(
                        "Shutdown signal received; draining {} in-flight fetches",
                        tasks.len()
                    );
                }
                Some(joined) = tasks.join_next() => {
                    match joined {
                        Ok((identifier, report)) => {
                            self.record_outcome(&identifier, report, &mut summary)?;
                            processed += 1;
                            if processed % 100 == 0 {
                                let rate = processed as f64 / started.elapsed().as_secs_f64();
                                tracing::info!(
                                    "Progress: {} processed, {} skipped, {:.2} ids/sec",
                                    processed,
                                    summary.skipped,
                                    rate
                                );
                            }
                        }
                        Err(e) => {
                            // The identifier stays pending and is picked up
                            // again on the next run
                            tracing::error!("Fetch task aborted: {}", e);
                        }
                    }
                }
            }
        }

        if stopping {
            summary.interrupted = true;
            self.ledger
                .update_run_status(self.run_id, RunStatus::Interrupted)?;
        } else {
            self.ledger.complete_run(self.run_id)?;
        }

        tracing::info!(
            "Run {} {}: {} succeeded, {} failed, {} skipped of {} total in {:?}",
            self.run_id,
            if stopping { "interrupted" } else { "finished" },
            summary.succeeded,
            summary.failed,
            summary.skipped,
            summary.total_identifiers,
            started.elapsed()
        );

        Ok(summary)
    }

    /// Persists one fetch outcome
    ///
    /// Success: append to the output dataset, then mark the ledger. A crash
    /// between the two is repaired by startup reconciliation, so the row is
    /// never lost and never duplicated. Permanent failure: log, then mark.
    /// Errors here are infrastructure failures (unwritable output, broken
    /// ledger) and abort the run; a fetch-level failure never reaches this
    /// point as an error.
    fn record_outcome(
        &mut self,
        identifier: &str,
        report: FetchReport,
        summary: &mut RunSummary,
    ) -> Result<()> {
        match report.outcome {
            FetchOutcome::Success(record) => {
                self.writer.append(&record)?;
                self.ledger
                    .mark_succeeded(identifier, report.attempts, self.run_id)?;
                summary.succeeded += 1;
                tracing::debug!(
                    "Fetched {} in {} attempt(s)",
                    identifier,
                    report.attempts
                );
            }
            FetchOutcome::Failed { kind, message } => {
                self.failures
                    .append(identifier, kind, report.attempts, &message)?;
                self.ledger
                    .mark_failed(identifier, kind, report.attempts, &message, self.run_id)?;
                summary.failed += 1;
                tracing::debug!(
                    "Failed {} after {} attempt(s): {} ({})",
                    identifier,
                    report.attempts,
                    kind,
                    message
                );
            }
        }
        Ok(())
    }

    /// Returns the ID of the run this controller registered
    pub fn run_id(&self) -> i64 {
        self.run_id
    }
}

/// Marks every identifier present in the output dataset as succeeded
///
/// Returns the number of entries that actually changed state.
fn reconcile_ledger(
    ledger: &mut SqliteLedger,
    results_path: &Path,
    run_id: i64,
) -> Result<usize> {
    let mut reconciled = 0usize;
    for identifier in load_written_ids(results_path)? {
        if !ledger.is_completed(&identifier)? {
            ledger.mark_succeeded(&identifier, 0, run_id)?;
            reconciled += 1;
        }
    }
    Ok(reconciled)
}

/// Runs a complete harvest with the given configuration
pub async fn run_harvest(config: Config, config_hash: &str, fresh: bool) -> Result<RunSummary> {
    let mut controller = Controller::new(config, config_hash, fresh)?;
    controller.run().await
}
