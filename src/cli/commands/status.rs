//! Completion cache statistics.

use crate::cache::CompletionCache;
use crate::config::Config;

/// Print cache counts and every failed key with its reason.
pub fn cmd_status(config: &Config) -> anyhow::Result<()> {
    let cache = CompletionCache::load(&config.paths.cache_path)?;
    let stats = cache.stats();

    println!("Cache: {}", cache.dir().display());
    println!("  Completed:      {}", stats.completed);
    println!("  Failed:         {}", stats.failed);
    println!("  Missing lyrics: {}", stats.missing_lyrics);

    let failed = cache.failed_records();
    if !failed.is_empty() {
        println!();
        println!("Failed tracks:");
        for record in failed {
            println!(
                "  {} ({}): {}",
                record.key,
                record.timestamp.format("%Y-%m-%d %H:%M"),
                record.reason.as_deref().unwrap_or("unknown reason")
            );
        }
    }
    Ok(())
}
