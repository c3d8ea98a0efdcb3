use std::path::Path;

use anyhow::{Result, bail};

use crate::config;

/// `locdiff init` — create .locdiff/config.toml.
pub fn init(storage_root: &Path, force: bool) -> Result<()> {
    if !force && config::config_file_exists() {
        bail!(".locdiff/config.toml already exists (use --force to overwrite)");
    }

    config::write_template(storage_root)?;
    config::write_gitignore(force)?;

    let verb = if force { "Regenerated" } else { "Created" };
    println!("{verb} .locdiff/config.toml");
    println!("  storage.root = {}", storage_root.display());
    Ok(())
}
