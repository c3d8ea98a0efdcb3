use std::path::PathBuf;

use anyhow::{Context, Result};

use super::{load, validate_parallel};

/// Values extracted from the CLI that participate in the merge.
pub struct CliOverrides {
    pub storage_root: Option<PathBuf>,
    pub parallel: Option<usize>,
}

/// Fully resolved config after CLI > env > file merge.
pub struct ResolvedConfig {
    pub storage_root: PathBuf,
    pub db_path: PathBuf,
    pub parallel: usize,
}

impl ResolvedConfig {
    pub fn new(cli: CliOverrides) -> Result<Self> {
        // 1. File layer
        let file_config = load().context("Run `locdiff init` first")?;

        // 2. Env layer
        let env_root = std::env::var("LOCDIFF_STORAGE_ROOT").ok().map(PathBuf::from);
        let env_parallel: Option<usize> = std::env::var("LOCDIFF_PARALLEL")
            .ok()
            .map(|v| v.parse::<usize>())
            .transpose()
            .context("LOCDIFF_PARALLEL must be a positive integer")?;

        // 3. CLI > env > file (highest priority first)
        let storage_root = cli
            .storage_root
            .or(env_root)
            .unwrap_or_else(|| file_config.storage.root.clone());

        let parallel = cli
            .parallel
            .or(env_parallel)
            .unwrap_or(file_config.compare.parallel);
        validate_parallel(parallel).map_err(|e| anyhow::anyhow!("{e}"))?;

        let db_path = file_config
            .database
            .path
            .unwrap_or_else(super::default_db_path);

        Ok(Self {
            storage_root,
            db_path,
            parallel,
        })
    }
}
