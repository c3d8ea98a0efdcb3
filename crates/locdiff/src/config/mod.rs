pub mod resolve;
pub mod template;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

pub use self::resolve::{CliOverrides, ResolvedConfig};
pub use self::template::{config_file_exists, write_gitignore, write_template};

pub(crate) const CONFIG_DIR: &str = ".locdiff";
const CONFIG_FILE: &str = "config.toml";
const DB_FILE: &str = "locdiff.db";

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub compare: CompareConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for screenshots and diff artifacts.
    pub root: PathBuf,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Comparison database location. Defaults to `.locdiff/locdiff.db`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompareConfig {
    /// Worker pool size for batch comparison.
    #[serde(default = "default_parallel")]
    pub parallel: usize,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
        }
    }
}

fn default_parallel() -> usize {
    4
}

pub fn validate_parallel(v: usize) -> Result<usize, String> {
    if v == 0 {
        return Err("parallel must be at least 1".to_string());
    }
    Ok(v)
}

impl Config {
    /// Validate semantic constraints that serde cannot express.
    fn validate(&self) -> Result<()> {
        if self.storage.root.as_os_str().is_empty() {
            bail!("storage.root must not be empty");
        }
        validate_parallel(self.compare.parallel).map_err(|e| anyhow::anyhow!("compare.{e}"))?;
        Ok(())
    }
}

pub fn default_db_path() -> PathBuf {
    Path::new(CONFIG_DIR).join(DB_FILE)
}

pub fn load() -> Result<Config> {
    let path = Path::new(CONFIG_DIR).join(CONFIG_FILE);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: Config =
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
    config.validate()?;
    Ok(config)
}
