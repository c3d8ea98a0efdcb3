use std::path::PathBuf;

use tracing::debug;

use super::diff;
use crate::error::CompareError;
use crate::store::db::{ComparisonRecord, Db, ScreenshotRecord};
use crate::store::{self, Storage};

/// Everything a worker needs to compute one uncached pair.
///
/// Paths are resolved up front so the compute step never touches the database.
#[derive(Debug, Clone)]
pub struct DiffJob {
    pub source_id: i64,
    pub target_id: i64,
    pub source_hash: String,
    pub target_hash: String,
    pub source_abs: PathBuf,
    pub target_abs: PathBuf,
    pub forward_rel: String,
    pub forward_abs: PathBuf,
    pub reverse_abs: PathBuf,
}

/// Cache consultation outcome for one ordered pair.
pub enum CacheDecision {
    /// Row present, hashes current, artifact on disk where expected.
    Hit(ComparisonRecord),
    /// Anything else: compute (and re-persist) the pair.
    Miss(DiffJob),
}

/// Decide hit or miss for (source, target) given the cached row, if any.
///
/// A cached row hits only when it was computed from the screenshots' current
/// content hashes and its diff artifact still exists (when one is expected).
/// A row whose artifact was externally deleted, or whose source was
/// re-uploaded since, is a miss and gets recomputed.
pub fn classify(
    storage: &Storage,
    cached: Option<&ComparisonRecord>,
    source: &ScreenshotRecord,
    target: &ScreenshotRecord,
) -> CacheDecision {
    if let Some(rec) = cached {
        let hashes_current =
            rec.source_hash == source.content_hash && rec.target_hash == target.content_hash;
        let artifact_ok = match &rec.diff_path {
            Some(rel) => storage.abs(rel).exists(),
            None => true,
        };
        if hashes_current && artifact_ok {
            debug!(source = source.id, target = target.id, "comparison cache hit");
            return CacheDecision::Hit(rec.clone());
        }
        debug!(
            source = source.id,
            target = target.id,
            stale_hash = !hashes_current,
            "cached comparison stale, recomputing"
        );
    }

    let forward_rel = Storage::diff_rel(source.id, target.id);
    let reverse_rel = Storage::diff_rel(target.id, source.id);
    CacheDecision::Miss(DiffJob {
        source_id: source.id,
        target_id: target.id,
        source_hash: source.content_hash.clone(),
        target_hash: target.content_hash.clone(),
        source_abs: storage.abs(&source.rel_path),
        target_abs: storage.abs(&target.rel_path),
        forward_abs: storage.abs(&forward_rel),
        reverse_abs: storage.abs(&reverse_rel),
        forward_rel,
    })
}

/// Run one diff job to completion. Blocking; call via `spawn_blocking`.
///
/// Verifies both source files exist, creates the artifact directory, scans
/// the pixels writing the forward artifact, then duplicates it to the reverse
/// path instead of scanning again.
pub fn run_job(job: &DiffJob) -> Result<f64, CompareError> {
    for path in [&job.source_abs, &job.target_abs] {
        if !path.exists() {
            return Err(CompareError::MissingFile(path.clone()));
        }
    }
    store::ensure_parent(&job.forward_abs)?;

    let difference = diff::diff_files(
        Some(&job.source_abs),
        Some(&job.target_abs),
        Some(&job.forward_abs),
    )?;
    store::copy_reverse_artifact(&job.forward_abs, &job.reverse_abs)?;
    Ok(difference)
}

/// Build the persistable record for a completed job.
pub fn record_for(job: &DiffJob, difference: f64) -> ComparisonRecord {
    ComparisonRecord {
        source_id: job.source_id,
        target_id: job.target_id,
        difference,
        diff_path: Some(job.forward_rel.clone()),
        source_hash: job.source_hash.clone(),
        target_hash: job.target_hash.clone(),
    }
}

/// Cache-or-compute for a single ordered pair, run inline.
///
/// The batch path splits the same steps into classify / compute / persist
/// phases so the compute step can fan out across workers.
pub fn get_or_compute(
    db: &mut Db,
    storage: &Storage,
    source: &ScreenshotRecord,
    target: &ScreenshotRecord,
) -> Result<ComparisonRecord, CompareError> {
    if source.id == target.id {
        // Self-comparison is synthesized on demand, never persisted.
        return Ok(ComparisonRecord {
            source_id: source.id,
            target_id: target.id,
            difference: 0.0,
            diff_path: None,
            source_hash: source.content_hash.clone(),
            target_hash: target.content_hash.clone(),
        });
    }

    let cached = db.comparison(source.id, target.id)?;
    match classify(storage, cached.as_ref(), source, target) {
        CacheDecision::Hit(rec) => Ok(rec),
        CacheDecision::Miss(job) => {
            let difference = run_job(&job)?;
            let record = record_for(&job, difference);
            db.upsert_comparison_pair(&record)?;
            Ok(record)
        }
    }
}
