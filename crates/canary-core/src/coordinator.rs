//! Run coordinator: one bounded verification pass over the whole catalog.
//!
//! Loads every entry, spawns one task per entry without waiting on any of
//! them, then waits for exactly as many completion signals as entries loaded.

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

use crate::catalog::{CatalogGateway, StoreError};
use crate::config::CanaryConfig;
use crate::digest::ChecksumAlgorithm;
use crate::fetch::ResourceFetcher;
use crate::limiter::AdmissionLimiter;
use crate::verify::{verify_entry, CompletionGuard, TaskReport, VerifyContext};

/// Per-run knobs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Cap on simultaneously outstanding fetches.
    pub max_concurrent_fetches: usize,
    pub algorithm: ChecksumAlgorithm,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions::from(&CanaryConfig::default())
    }
}

impl From<&CanaryConfig> for RunOptions {
    fn from(cfg: &CanaryConfig) -> Self {
        Self {
            max_concurrent_fetches: cfg.max_concurrent_fetches,
            algorithm: cfg.algorithm,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("error getting entries from catalog: {0}")]
    Load(#[source] StoreError),
}

/// Everything the tasks of one run reported, in completion order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Entries loaded at the start of the run.
    pub entries: usize,
    pub reports: Vec<TaskReport>,
    /// Highest number of fetches in flight at once.
    pub peak_fetches: usize,
    pub elapsed_ms: u128,
}

impl RunReport {
    fn count(&self, label: &str) -> usize {
        self.reports
            .iter()
            .filter(|r| r.outcome.label() == label)
            .count()
    }

    pub fn matched(&self) -> usize {
        self.count("matched")
    }

    pub fn corrected(&self) -> usize {
        self.count("corrected")
    }

    pub fn correction_failed(&self) -> usize {
        self.count("correction-failed")
    }

    pub fn fetch_failed(&self) -> usize {
        self.count("fetch-failed")
    }

    pub fn aborted(&self) -> usize {
        self.count("aborted")
    }

    /// Entries whose catalog checksum still disagrees with served content, or unknown.
    pub fn unresolved(&self) -> impl Iterator<Item = &TaskReport> {
        self.reports.iter().filter(|r| !r.outcome.is_consistent())
    }

    pub fn summary(&self) -> String {
        format!(
            "{} checked: {} matched, {} corrected, {} correction failed, {} fetch failed, {} aborted",
            self.reports.len(),
            self.matched(),
            self.corrected(),
            self.correction_failed(),
            self.fetch_failed(),
            self.aborted()
        )
    }
}

/// Run one verification pass.
///
/// A load failure ends the run before any task starts. Per-entry failures
/// never surface here; they are logged by the task and show up in the report.
pub async fn run(
    gateway: Arc<dyn CatalogGateway>,
    fetcher: Arc<dyn ResourceFetcher>,
    opts: &RunOptions,
) -> Result<RunReport, RunError> {
    let started = Instant::now();
    let entries = gateway.load_all().await.map_err(|e| {
        tracing::error!(error = %e, "catalog load failed");
        RunError::Load(e)
    })?;
    let total = entries.len();

    let limiter = Arc::new(AdmissionLimiter::new(opts.max_concurrent_fetches));
    tracing::info!(
        entries = total,
        max_fetches = limiter.capacity(),
        algorithm = %opts.algorithm,
        "verification run starting"
    );

    let ctx = VerifyContext {
        gateway,
        fetcher,
        limiter: Arc::clone(&limiter),
        algorithm: opts.algorithm,
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<TaskReport>();
    for entry in entries {
        let ctx = ctx.clone();
        let guard = CompletionGuard::new(tx.clone(), &entry);
        tokio::spawn(async move {
            let outcome = verify_entry(&ctx, entry).await;
            guard.finish(outcome);
        });
    }
    drop(tx);

    let mut reports = Vec::with_capacity(total);
    while reports.len() < total {
        let Some(report) = rx.recv().await else {
            // Every guard sends before its sender drops, so this is unreachable
            // unless a task was lost without unwinding.
            tracing::error!(
                received = reports.len(),
                expected = total,
                "completion channel closed early"
            );
            break;
        };
        reports.push(report);
    }

    let report = RunReport {
        entries: total,
        reports,
        peak_fetches: limiter.peak(),
        elapsed_ms: started.elapsed().as_millis(),
    };
    tracing::info!(peak_fetches = report.peak_fetches, "{}", report.summary());
    Ok(report)
}
