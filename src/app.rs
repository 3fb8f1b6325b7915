//! Process entry shared by the `archive-blobs` and `transfer-blobs` binaries.

use crate::{
    config::AppConfig,
    pipeline::{Endpoints, Migrator, Variant},
    services::connection::AccountDirectory,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub async fn run(variant: Variant) -> Result<()> {
    // --- Logging setup (stderr, stdout carries progress) ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;
    tracing::info!("Starting {:?} run with config: {:?}", variant, cfg);

    println!("{}", variant.banner(cfg.cutoff));

    // --- Open both accounts ---
    let directory = AccountDirectory::new();
    let source = directory
        .connect(&cfg.source_connection)
        .await
        .context("opening source account")?;
    let destination = directory
        .connect(&cfg.destination_connection)
        .await
        .context("opening destination account")?;

    let migrator = Migrator::new(
        Endpoints {
            source: Arc::new(source),
            source_container: cfg.source_container.clone(),
            destination: Arc::new(destination),
            destination_container: cfg.destination_container.clone(),
        },
        variant,
    )
    .with_page_size(cfg.page_size);

    // --- Run until done or interrupted ---
    tokio::select! {
        result = migrator.run(cfg.cutoff) => {
            result?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("listening for ctrl-c")?;
            tracing::warn!("interrupted, in-flight copy left as-is");
            anyhow::bail!("interrupted");
        }
    }

    println!();
    println!("Done");
    Ok(())
}
