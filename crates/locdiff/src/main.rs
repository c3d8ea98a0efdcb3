mod batch;
mod cli;
mod commands;
mod compare;
mod config;
mod error;
mod report;
mod store;

use clap::Parser;
use config::ResolvedConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("locdiff=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Command::Init {
            storage_root,
            force,
        } => {
            commands::init(&storage_root, force)?;
        }
        cli::Command::Upload {
            project,
            locale,
            build,
            patterns,
            overrides,
        } => {
            let config = ResolvedConfig::new(overrides.into())?;
            commands::upload(config, &project, &locale, &build, &patterns)?;
        }
        cli::Command::Compare {
            project,
            source_id,
            target_id,
            json,
            overrides,
        } => {
            let config = ResolvedConfig::new(overrides.into())?;
            commands::compare(config, &project, source_id, target_id, json).await?;
        }
        cli::Command::Batch {
            project,
            source_build,
            source_locale,
            target_build,
            target_locale,
            json,
            overrides,
        } => {
            let config = ResolvedConfig::new(overrides.into())?;
            let code = commands::batch(
                config,
                &project,
                source_build,
                source_locale,
                target_build,
                target_locale,
                json,
            )
            .await?;
            std::process::exit(code);
        }
    }

    Ok(())
}
