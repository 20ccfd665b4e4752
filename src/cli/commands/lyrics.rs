//! Lyrics backfill.

use std::sync::Arc;

use anyhow::Context;
use tokio::runtime::Runtime;

use crate::cache::CompletionCache;
use crate::catalog::TidalClient;
use crate::config::Config;
use crate::downloader::{DownloadOptions, Downloader};

/// Look up lyrics again for completed downloads without a sidecar.
pub fn cmd_lyrics(rt: &Runtime, config: &Config) -> anyhow::Result<()> {
    if !config.songs.lyrics {
        println!("Lyrics are disabled in the config (songs.lyrics = false)");
        return Ok(());
    }

    let cache = Arc::new(CompletionCache::load(&config.paths.cache_path)?);

    rt.block_on(async {
        let catalog = TidalClient::connect(&config.catalog)
            .await
            .context("Failed to connect to the catalog")?;
        let downloader = Downloader::new(
            Arc::new(catalog),
            cache.clone(),
            DownloadOptions::from_config(config),
        );

        let summary = downloader.backfill_lyrics().await;
        cache.flush()?;

        println!(
            "Checked {} tracks: {} lyrics added, {} lookups failed",
            summary.checked, summary.written, summary.failed
        );
        anyhow::Ok(())
    })
}
