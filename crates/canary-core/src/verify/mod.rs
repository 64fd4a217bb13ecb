//! Verification tasks.
//!
//! One task per catalog entry. Each fetches its resource under the shared
//! admission limiter, digests the body, and corrects the catalog on drift.
//! Completion is signalled by a `CompletionGuard` held for the task's life.

mod completion;
mod outcome;
mod task;

use std::sync::Arc;

use crate::catalog::CatalogGateway;
use crate::digest::ChecksumAlgorithm;
use crate::fetch::ResourceFetcher;
use crate::limiter::AdmissionLimiter;

pub use completion::CompletionGuard;
pub use outcome::{TaskReport, VerifyOutcome};
pub use task::verify_entry;

/// Collaborators shared by every task in a run.
#[derive(Clone)]
pub struct VerifyContext {
    pub gateway: Arc<dyn CatalogGateway>,
    pub fetcher: Arc<dyn ResourceFetcher>,
    pub limiter: Arc<AdmissionLimiter>,
    pub algorithm: ChecksumAlgorithm,
}
