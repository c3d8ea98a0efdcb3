use anyhow::{Context, Result};

use crate::compare::cache;
use crate::compare::{ComparisonRow, PairReport};
use crate::config::ResolvedConfig;
use crate::error::CompareError;
use crate::report::terminal;
use crate::store::Storage;
use crate::store::db::Db;

/// `locdiff compare` — one pair by id. Unlike batch, failures propagate.
pub async fn compare(
    config: ResolvedConfig,
    project: &str,
    source_id: i64,
    target_id: i64,
    json: bool,
) -> Result<()> {
    let storage = Storage::new(&config.storage_root);
    let db = Db::open(&config.db_path)?;

    let source = db
        .screenshot(source_id)?
        .ok_or(CompareError::NotFound(source_id))?;
    let target = db
        .screenshot(target_id)?
        .ok_or(CompareError::NotFound(target_id))?;
    for rec in [&source, &target] {
        if rec.project != project {
            return Err(CompareError::WrongProject {
                id: rec.id,
                project: project.to_string(),
            }
            .into());
        }
    }

    let row = if source.id == target.id {
        ComparisonRow::self_same(&source)
    } else {
        // The pixel scan is CPU-bound; keep it off the async runtime.
        tokio::task::spawn_blocking(move || -> Result<ComparisonRow, CompareError> {
            let mut db = db;
            let record = cache::get_or_compute(&mut db, &storage, &source, &target)?;
            Ok(ComparisonRow::from_record(&record, &source, &target))
        })
        .await
        .context("Comparison task panicked")??
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&row)?);
    } else {
        terminal::print_pair_line(&PairReport::Row(row));
    }
    Ok(())
}
