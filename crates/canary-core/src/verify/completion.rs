//! RAII completion signal for verification tasks.

use tokio::sync::mpsc::UnboundedSender;

use super::outcome::{TaskReport, VerifyOutcome};
use crate::catalog::{CatalogEntry, EntryId};

/// Sends the task's report on the run channel when dropped, so every task
/// signals exactly once on every path, panics included. A guard dropped
/// without `finish` reports `Aborted`.
#[derive(Debug)]
pub struct CompletionGuard {
    tx: UnboundedSender<TaskReport>,
    id: EntryId,
    url: String,
    outcome: Option<VerifyOutcome>,
}

impl CompletionGuard {
    pub fn new(tx: UnboundedSender<TaskReport>, entry: &CatalogEntry) -> Self {
        Self {
            tx,
            id: entry.id.clone(),
            url: entry.url.clone(),
            outcome: None,
        }
    }

    /// Record the outcome and signal completion.
    pub fn finish(mut self, outcome: VerifyOutcome) {
        self.outcome = Some(outcome);
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        let outcome = self.outcome.take().unwrap_or(VerifyOutcome::Aborted);
        if outcome == VerifyOutcome::Aborted {
            tracing::error!(id = %self.id, url = %self.url, "verification task aborted");
        }
        let report = TaskReport {
            id: self.id.clone(),
            url: std::mem::take(&mut self.url),
            outcome,
        };
        if self.tx.send(report).is_err() {
            tracing::warn!(id = %self.id, "run coordinator gone; completion dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn entry() -> CatalogEntry {
        CatalogEntry::new("e1", "https://example.com/a", "abc123")
    }

    #[test]
    fn finish_sends_recorded_outcome_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let guard = CompletionGuard::new(tx, &entry());
        guard.finish(VerifyOutcome::Matched {
            checksum: "abc123".to_string(),
        });
        let report = rx.try_recv().unwrap();
        assert_eq!(report.id.as_str(), "e1");
        assert_eq!(report.url, "https://example.com/a");
        assert_eq!(report.outcome.label(), "matched");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn plain_drop_reports_aborted() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        drop(CompletionGuard::new(tx, &entry()));
        assert_eq!(rx.try_recv().unwrap().outcome, VerifyOutcome::Aborted);
    }

    #[tokio::test]
    async fn panicking_task_still_signals() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let guard = CompletionGuard::new(tx, &entry());
        let handle = tokio::spawn(async move {
            let _guard = guard;
            panic!("boom");
        });
        assert!(handle.await.is_err());
        let report = rx.recv().await.unwrap();
        assert_eq!(report.outcome, VerifyOutcome::Aborted);
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn closed_channel_does_not_panic() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        CompletionGuard::new(tx, &entry()).finish(VerifyOutcome::Aborted);
    }
}
