//! Per-entry verification: admit → fetch → release → digest → compare → correct.

use std::sync::Arc;

use super::outcome::VerifyOutcome;
use super::VerifyContext;
use crate::catalog::CatalogEntry;
use crate::digest::{self, StreamDigest};
use crate::fetch::{FetchError, FetchErrorKind, ResourceBody};

/// Fetch under an admission permit. The permit covers only the request and
/// is released when this returns, before any body is digested.
async fn admitted_fetch(ctx: &VerifyContext, location: &str) -> Result<ResourceBody, FetchError> {
    let _permit = ctx.limiter.acquire().await;
    let fetcher = Arc::clone(&ctx.fetcher);
    let owned = location.to_string();
    match tokio::task::spawn_blocking(move || fetcher.fetch(&owned)).await {
        Ok(result) => result,
        Err(join) => Err(FetchError::new(
            location,
            FetchErrorKind::Aborted(join.to_string()),
        )),
    }
}

async fn digest_body(ctx: &VerifyContext, body: ResourceBody) -> Result<StreamDigest, String> {
    let algorithm = ctx.algorithm;
    match tokio::task::spawn_blocking(move || digest::digest_stream(algorithm, body)).await {
        Ok(Ok(d)) => Ok(d),
        Ok(Err(e)) => Err(e.to_string()),
        Err(join) => Err(format!("digest aborted: {}", join)),
    }
}

/// Verify one entry and, on drift, write the new checksum back through the
/// gateway. Never fails: every error ends in a logged outcome.
pub async fn verify_entry(ctx: &VerifyContext, mut entry: CatalogEntry) -> VerifyOutcome {
    tracing::info!(id = %entry.id, url = %entry.url, "checking");

    let body = match admitted_fetch(ctx, &entry.url).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(id = %entry.id, url = %entry.url, error = %e, "fetch failed");
            return VerifyOutcome::FetchFailed {
                error: e.to_string(),
            };
        }
    };
    if !body.is_success() {
        tracing::warn!(
            id = %entry.id,
            url = %entry.url,
            status = body.status(),
            "hashing non-2xx response body"
        );
    }

    let computed = match digest_body(ctx, body).await {
        Ok(d) => d,
        Err(error) => {
            tracing::warn!(id = %entry.id, url = %entry.url, %error, "body read failed");
            return VerifyOutcome::FetchFailed { error };
        }
    };
    tracing::debug!(
        id = %entry.id,
        bytes = computed.bytes_read,
        digest = %computed.hex,
        "digest computed"
    );

    if digest::checksums_match(&computed.hex, &entry.checksum) {
        tracing::info!(id = %entry.id, url = %entry.url, "checksum matched");
        return VerifyOutcome::Matched {
            checksum: computed.hex,
        };
    }

    let previous = std::mem::replace(&mut entry.checksum, computed.hex.clone());
    tracing::info!(
        id = %entry.id,
        url = %entry.url,
        stored = %previous,
        computed = %computed.hex,
        "checksum mismatch"
    );
    if !previous.is_empty() && previous.trim().len() != ctx.algorithm.hex_len() {
        tracing::warn!(
            id = %entry.id,
            algorithm = %ctx.algorithm,
            "stored checksum length does not fit the configured algorithm"
        );
    }

    match ctx.gateway.update_by_id(&entry.id, &entry).await {
        Ok(()) => VerifyOutcome::Corrected {
            previous,
            current: computed.hex,
        },
        Err(e) => {
            // The catalog keeps the stale value until a later run corrects it.
            tracing::error!(
                id = %entry.id,
                url = %entry.url,
                error = %e,
                "checksum correction failed; catalog left stale"
            );
            VerifyOutcome::CorrectionFailed {
                previous,
                current: computed.hex,
                error: e.to_string(),
            }
        }
    }
}
