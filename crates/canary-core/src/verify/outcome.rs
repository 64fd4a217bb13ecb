//! Terminal states of a verification task.

use serde::Serialize;

use crate::catalog::EntryId;

/// How one entry's verification ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerifyOutcome {
    /// Served content still digests to the stored checksum.
    Matched { checksum: String },
    /// Drift detected and the new checksum was persisted.
    Corrected { previous: String, current: String },
    /// Drift detected but the update failed; the catalog still holds `previous`.
    CorrectionFailed {
        previous: String,
        current: String,
        error: String,
    },
    /// The resource could not be fetched or fully read. Entry left untouched.
    FetchFailed { error: String },
    /// The task ended without recording an outcome (it panicked).
    Aborted,
}

impl VerifyOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            VerifyOutcome::Matched { .. } => "matched",
            VerifyOutcome::Corrected { .. } => "corrected",
            VerifyOutcome::CorrectionFailed { .. } => "correction-failed",
            VerifyOutcome::FetchFailed { .. } => "fetch-failed",
            VerifyOutcome::Aborted => "aborted",
        }
    }

    /// True when the catalog now agrees with the served content.
    pub fn is_consistent(&self) -> bool {
        matches!(
            self,
            VerifyOutcome::Matched { .. } | VerifyOutcome::Corrected { .. }
        )
    }
}

/// Completion message sent by every task exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskReport {
    pub id: EntryId,
    pub url: String,
    #[serde(flatten)]
    pub outcome: VerifyOutcome,
}
