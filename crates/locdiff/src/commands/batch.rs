use std::time::Instant;

use anyhow::Result;

use crate::batch::{SetCoords, list_comparisons};
use crate::compare::PairReport;
use crate::config::ResolvedConfig;
use crate::report::terminal;
use crate::store::Storage;
use crate::store::db::Db;

/// `locdiff batch` — compare two build/locale screenshot sets.
/// Returns exit code: 0 = every pair compared, 1 = any pair errored.
pub async fn batch(
    config: ResolvedConfig,
    project: &str,
    source_build: String,
    source_locale: String,
    target_build: String,
    target_locale: String,
    json: bool,
) -> Result<i32> {
    let storage = Storage::new(&config.storage_root);
    let mut db = Db::open(&config.db_path)?;

    let start = Instant::now();
    let reports = list_comparisons(
        &mut db,
        &storage,
        project,
        &SetCoords {
            build: source_build,
            locale: source_locale,
        },
        &SetCoords {
            build: target_build,
            locale: target_locale,
        },
        config.parallel,
    )
    .await?;

    let errored = reports
        .iter()
        .filter(|r| matches!(r, PairReport::Failed(_)))
        .count();

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        let mut same = 0usize;
        let mut differing = 0usize;
        let mut missing = 0usize;
        for report in &reports {
            terminal::print_pair_line(report);
            match report {
                PairReport::Row(row) if row.is_sentinel() => missing += 1,
                PairReport::Row(row) if row.difference == 0.0 => same += 1,
                PairReport::Row(_) => differing += 1,
                PairReport::Failed(_) => {}
            }
        }
        terminal::print_summary(reports.len(), same, differing, missing, errored, start.elapsed());
    }

    Ok(if errored > 0 { 1 } else { 0 })
}
