use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config;

fn parse_parallel(s: &str) -> Result<usize, String> {
    let v: usize = s.parse().map_err(|e| format!("{e}"))?;
    config::validate_parallel(v)
}

/// Config overrides shared by the comparison subcommands.
#[derive(Args)]
pub struct ConfigOverrides {
    /// Storage root for screenshots and diff artifacts (overrides config)
    #[arg(long)]
    pub storage_root: Option<PathBuf>,
    /// Diff worker pool size (overrides config)
    #[arg(long, value_parser = parse_parallel)]
    pub parallel: Option<usize>,
}

impl From<ConfigOverrides> for config::CliOverrides {
    fn from(o: ConfigOverrides) -> Self {
        Self {
            storage_root: o.storage_root,
            parallel: o.parallel,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "locdiff",
    about = "Pixel comparison of localized UI screenshots across builds"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create .locdiff/config.toml with default settings
    Init {
        /// Storage root for screenshots and diff artifacts
        #[arg(long, default_value = "screens")]
        storage_root: PathBuf,
        /// Overwrite existing config and gitignore
        #[arg(long, short = 'f')]
        force: bool,
    },

    /// Register screenshot files for a (project, locale, build)
    Upload {
        /// Project name
        project: String,
        /// Locale code (e.g. "en", "ja")
        locale: String,
        /// Build identifier
        build: String,
        /// PNG files or glob patterns; the file stem becomes the screen name
        #[arg(required = true)]
        patterns: Vec<String>,
        #[command(flatten)]
        overrides: ConfigOverrides,
    },

    /// Compare one screenshot pair by id
    Compare {
        /// Project name
        project: String,
        /// Source screenshot id
        #[arg(long)]
        source_id: i64,
        /// Target screenshot id
        #[arg(long)]
        target_id: i64,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        overrides: ConfigOverrides,
    },

    /// Compare every screen of one build/locale against another
    Batch {
        /// Project name
        project: String,
        /// Build identifier of the source set
        #[arg(long)]
        source_build: String,
        /// Locale code of the source set
        #[arg(long)]
        source_locale: String,
        /// Build identifier of the target set
        #[arg(long)]
        target_build: String,
        /// Locale code of the target set
        #[arg(long)]
        target_locale: String,
        /// Print the result list as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        overrides: ConfigOverrides,
    },
}
