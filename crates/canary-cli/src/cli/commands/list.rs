//! `canary list` – show catalog entries.

use anyhow::{Context, Result};
use canary_core::catalog::{CatalogGateway, SqliteCatalog};
use canary_core::config::CanaryConfig;

pub async fn run_list(cfg: &CanaryConfig) -> Result<()> {
    let catalog = SqliteCatalog::open(cfg.database_url.as_deref(), &cfg.collection)
        .await
        .context("open catalog")?;
    let entries = catalog.load_all().await;
    catalog.close().await;
    let entries = entries?;

    if entries.is_empty() {
        println!("No entries in catalog.");
    } else {
        println!("{:<12} {:<34} {}", "ID", "CHECKSUM", "URL");
        for e in entries {
            let checksum = if e.checksum.is_empty() {
                "-"
            } else {
                e.checksum.as_str()
            };
            println!("{:<12} {:<34} {}", e.id, checksum, e.url);
        }
    }
    Ok(())
}
