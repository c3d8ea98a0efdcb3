use std::path::Path;

use anyhow::{Context, Result};

use super::{CONFIG_DIR, CONFIG_FILE};

/// Hand-crafted config template with commented-out keys.
/// Used by `locdiff init` instead of `toml::to_string_pretty()` so that
/// users can see the available knobs without uncommenting section headers.
const CONFIG_TEMPLATE: &str = r#"[storage]
root = "{root}"

# ─────────────────────────────────────────────────────────
# Comparison database — optional.
# ─────────────────────────────────────────────────────────
[database]
# path = ".locdiff/locdiff.db"

# ─────────────────────────────────────────────────────────
# Comparison — all fields optional.
# ─────────────────────────────────────────────────────────
[compare]
# parallel = 4                      # concurrent diff workers
"#;

pub fn config_file_exists() -> bool {
    Path::new(CONFIG_DIR).join(CONFIG_FILE).exists()
}

pub fn write_gitignore(force: bool) -> Result<()> {
    let path = Path::new(CONFIG_DIR).join(".gitignore");
    if !force && path.exists() {
        return Ok(());
    }
    std::fs::write(&path, "*.db\n*.db-wal\n*.db-shm\n")
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Write the hand-crafted config template (with commented-out sections).
pub fn write_template(root: &Path) -> Result<()> {
    let dir = Path::new(CONFIG_DIR);
    std::fs::create_dir_all(dir).context("Failed to create .locdiff directory")?;
    let path = dir.join(CONFIG_FILE);
    let content = CONFIG_TEMPLATE.replace("{root}", &root.display().to_string());
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::Config;
    use super::*;

    #[test]
    fn template_parses_with_defaults() {
        let rendered = CONFIG_TEMPLATE.replace("{root}", "screens");
        let config: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(config.storage.root, Path::new("screens"));
        assert!(config.database.path.is_none());
        assert_eq!(config.compare.parallel, 4);
    }
}
