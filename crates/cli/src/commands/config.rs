use std::path::Path;

use anyhow::{anyhow, Context, Result};
use curator_core::db::{save_config, CuratorConfig};

/// Write a default config file.
pub fn init_config_command(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(anyhow!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        ));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    save_config(path, &CuratorConfig::default())
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    println!("Wrote default config to {}", path.display());
    Ok(())
}
