//! Default config generation.

use std::path::Path;

use crate::config::{self, Config};

/// Write the default config to `path`.
pub fn cmd_init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    config::save(&Config::default(), path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
