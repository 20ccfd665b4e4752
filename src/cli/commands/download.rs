//! The playlist download pipeline.

use std::sync::Arc;

use anyhow::Context;
use tokio::runtime::Runtime;
use tracing::{info, warn};

use crate::cache::CompletionCache;
use crate::catalog::TidalClient;
use crate::config::Config;
use crate::downloader::{DownloadOptions, Downloader};
use crate::playlist;

/// Download every pending playlist entry and print the run summary.
///
/// The flags only ever enable `retry_failed` and `sync`; they cannot turn
/// off what the config file enables.
pub fn cmd_download(
    rt: &Runtime,
    config: &Config,
    retry_failed: bool,
    sync: bool,
) -> anyhow::Result<()> {
    let entries = playlist::load(&config.paths.playlist_file)?;
    info!(
        "Loaded {} entries from {}",
        entries.len(),
        config.paths.playlist_file.display()
    );

    let cache = Arc::new(CompletionCache::load(&config.paths.cache_path)?);

    let mut options = DownloadOptions::from_config(config);
    options.retry_failed |= retry_failed;
    options.sync |= sync;

    rt.block_on(async {
        let catalog = TidalClient::connect(&config.catalog)
            .await
            .context("Failed to connect to the catalog")?;
        let downloader = Downloader::new(Arc::new(catalog), cache.clone(), options);

        let stop = downloader.stop_signal();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Stop requested, waiting for downloads in progress");
                stop.stop();
            }
        });

        let summary = downloader.run(&entries).await;
        cache.flush()?;

        println!("{summary}");
        let stats = cache.stats();
        println!(
            "Cache: {} completed, {} failed, {} without lyrics",
            stats.completed, stats.failed, stats.missing_lyrics
        );
        anyhow::Ok(())
    })
}
