//! `canary run` – one verification pass over the catalog.

use anyhow::{Context, Result};
use canary_core::catalog::SqliteCatalog;
use canary_core::config::CanaryConfig;
use canary_core::fetch::{CurlFetcher, FetchOptions};
use canary_core::verify::{TaskReport, VerifyOutcome};
use canary_core::{RunOptions, RunReport};
use std::sync::Arc;

fn print_report(r: &TaskReport) {
    let state = r.outcome.label();
    match &r.outcome {
        VerifyOutcome::Matched { .. } | VerifyOutcome::Aborted => {
            println!("{:<12} {:<18} {}", r.id, state, r.url);
        }
        VerifyOutcome::Corrected { previous, current } => {
            println!(
                "{:<12} {:<18} {}  ({} -> {})",
                r.id,
                state,
                r.url,
                if previous.is_empty() { "-" } else { previous },
                current
            );
        }
        VerifyOutcome::CorrectionFailed { current, error, .. } => {
            println!("{:<12} {:<18} {}  (new {}: {})", r.id, state, r.url, current, error);
        }
        VerifyOutcome::FetchFailed { error } => {
            println!("{:<12} {:<18} {}  ({})", r.id, state, r.url, error);
        }
    }
}

fn print_text(report: &RunReport) {
    if report.entries == 0 {
        println!("No entries in catalog.");
        return;
    }
    println!("{:<12} {:<18} {}", "ID", "RESULT", "URL");
    for r in &report.reports {
        print_report(r);
    }
    println!("{}", report.summary());
}

pub async fn run_verify(cfg: &CanaryConfig, json: bool) -> Result<()> {
    let catalog = SqliteCatalog::open(cfg.database_url.as_deref(), &cfg.collection)
        .await
        .context("open catalog")?;
    let fetcher = Arc::new(CurlFetcher::new(FetchOptions::from(&cfg.fetch)));

    let result = canary_core::run(
        Arc::new(catalog.clone()),
        fetcher,
        &RunOptions::from(cfg),
    )
    .await;
    catalog.close().await;
    let report = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_text(&report);
    }

    let unresolved = report.unresolved().count();
    if unresolved > 0 {
        tracing::warn!("{} entr(ies) left unverified or stale", unresolved);
    }
    Ok(())
}
