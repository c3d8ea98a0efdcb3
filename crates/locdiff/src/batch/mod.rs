mod runner;

use std::collections::HashMap;

use tracing::{info, warn};

use crate::compare::cache::{self, CacheDecision};
use crate::compare::{ComparisonRow, PairFailure, PairReport};
use crate::error::CompareError;
use crate::store::Storage;
use crate::store::db::{Db, ScreenshotRecord};

/// Coordinates of one screenshot set within a project.
#[derive(Debug, Clone)]
pub struct SetCoords {
    pub build: String,
    pub locale: String,
}

/// Compare every screen of the source set against its same-named counterpart
/// in the target set, one entry per source screen.
///
/// Cached pairs are answered from the store; the rest run on a worker pool of
/// `parallel` tasks. Output order follows the source set's enumeration order
/// regardless of completion order. Pair-level failures become error entries
/// and never abort sibling pairs.
pub async fn list_comparisons(
    db: &mut Db,
    storage: &Storage,
    project: &str,
    source: &SetCoords,
    target: &SetCoords,
    parallel: usize,
) -> Result<Vec<PairReport>, CompareError> {
    let source_screens = db.screens_in_build(project, &source.locale, &source.build)?;

    if source.build == target.build && source.locale == target.locale {
        // Same coordinates: every screen compares to itself; no engine work.
        return Ok(source_screens
            .iter()
            .map(|s| PairReport::Row(ComparisonRow::self_same(s)))
            .collect());
    }

    let target_screens = db.screens_in_build(project, &target.locale, &target.build)?;
    let by_name: HashMap<&str, &ScreenshotRecord> = target_screens
        .iter()
        .map(|s| (s.screen.as_str(), s))
        .collect();

    // Prefetch every cached row for the source id set in one query.
    let source_ids: Vec<i64> = source_screens.iter().map(|s| s.id).collect();
    let cached = db.comparisons_for_sources(&source_ids)?;

    // Classify each pair; misses become indexed jobs for the worker pool.
    let mut slots: Vec<Option<PairReport>> = Vec::with_capacity(source_screens.len());
    let mut jobs = Vec::new();
    let mut pending: HashMap<usize, (&ScreenshotRecord, &ScreenshotRecord)> = HashMap::new();

    for (idx, src) in source_screens.iter().enumerate() {
        match by_name.get(src.screen.as_str()) {
            None => slots.push(Some(PairReport::Row(ComparisonRow::missing_counterpart(src)))),
            Some(&tgt) => match cache::classify(storage, cached.get(&(src.id, tgt.id)), src, tgt) {
                CacheDecision::Hit(rec) => {
                    slots.push(Some(PairReport::Row(ComparisonRow::from_record(
                        &rec, src, tgt,
                    ))));
                }
                CacheDecision::Miss(job) => {
                    jobs.push((idx, job));
                    pending.insert(idx, (src, tgt));
                    slots.push(None);
                }
            },
        }
    }

    info!(
        screens = source_screens.len(),
        compute = jobs.len(),
        "batch comparison planned"
    );

    let outcomes = runner::compute_all(jobs, parallel).await;

    for (idx, job, outcome) in outcomes {
        let Some(&(src, tgt)) = pending.get(&idx) else {
            continue;
        };
        let report = match outcome {
            Ok(difference) => {
                let record = cache::record_for(&job, difference);
                db.upsert_comparison_pair(&record)?;
                PairReport::Row(ComparisonRow::from_record(&record, src, tgt))
            }
            Err(e) => {
                warn!(source = src.id, target = tgt.id, error = %e, "pair comparison failed");
                PairReport::Failed(PairFailure {
                    source_id: src.id,
                    source_screen: src.screen.clone(),
                    error: e.to_string(),
                })
            }
        };
        slots[idx] = Some(report);
    }

    // Order follows the source set; a slot can only still be empty if a
    // worker died before reporting its job.
    Ok(source_screens
        .iter()
        .zip(slots)
        .map(|(src, slot)| match slot {
            Some(report) => report,
            None => PairReport::Failed(PairFailure {
                source_id: src.id,
                source_screen: src.screen.clone(),
                error: "diff worker failed before reporting a result".into(),
            }),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};

    use super::*;
    use crate::store::DIFF_DIR;
    use crate::store::db::UploadOutcome;

    fn setup() -> (tempfile::TempDir, Storage, Db) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path());
        let db = Db::open_in_memory().unwrap();
        (dir, storage, db)
    }

    fn png_bytes(img: &RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn put_screen(
        db: &mut Db,
        storage: &Storage,
        screen: &str,
        locale: &str,
        build: &str,
        img: &RgbaImage,
        hash: &str,
    ) -> ScreenshotRecord {
        let rel = Storage::screen_rel("shop", locale, build, screen);
        storage.store_screen(&rel, &png_bytes(img)).unwrap();
        match db
            .record_screenshot("shop", screen, locale, build, &rel, hash)
            .unwrap()
        {
            UploadOutcome::Created(rec) | UploadOutcome::Revised(rec) => rec,
        }
    }

    fn grey(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([200, 200, 200, 255]))
    }

    fn grey_with_spot(w: u32, h: u32) -> RgbaImage {
        let mut img = grey(w, h);
        img.put_pixel(2, 2, Rgba([0, 0, 0, 255]));
        img
    }

    fn coords(build: &str, locale: &str) -> SetCoords {
        SetCoords {
            build: build.to_string(),
            locale: locale.to_string(),
        }
    }

    fn row(report: &PairReport) -> &ComparisonRow {
        match report {
            PairReport::Row(row) => row,
            PairReport::Failed(f) => panic!("expected row, got failure: {}", f.error),
        }
    }

    #[tokio::test]
    async fn same_coordinates_short_circuit() {
        let (_dir, storage, mut db) = setup();
        for screen in ["Install", "Login", "Welcome"] {
            put_screen(&mut db, &storage, screen, "en", "b1", &grey(4, 4), "h");
        }

        let reports = list_comparisons(&mut db, &storage, "shop", &coords("b1", "en"), &coords("b1", "en"), 4)
            .await
            .unwrap();

        assert_eq!(reports.len(), 3);
        for report in &reports {
            let r = row(report);
            assert_eq!(r.difference, 0.0);
            assert_eq!(r.target_id, Some(r.source_id));
            assert!(r.diff_path.is_none());
        }
        // The engine never ran: no artifact directory was created.
        assert!(!storage.root().join(DIFF_DIR).exists());
    }

    #[tokio::test]
    async fn unmatched_screen_yields_sentinel() {
        let (_dir, storage, mut db) = setup();
        put_screen(&mut db, &storage, "Install", "en", "b1", &grey(4, 4), "h1");
        put_screen(&mut db, &storage, "Login", "en", "b1", &grey(4, 4), "h2");
        put_screen(&mut db, &storage, "Install", "ja", "b1", &grey(4, 4), "h3");

        let reports = list_comparisons(&mut db, &storage, "shop", &coords("b1", "en"), &coords("b1", "ja"), 4)
            .await
            .unwrap();

        assert_eq!(reports.len(), 2);
        // Source order is by screen name: Install, then Login.
        let install = row(&reports[0]);
        assert_eq!(install.source_screen, "Install");
        assert_eq!(install.difference, 0.0);

        let login = row(&reports[1]);
        assert_eq!(login.source_screen, "Login");
        assert!(login.is_sentinel());
        assert_eq!(login.difference, 1.0);
        assert!(login.diff_path.is_none());
    }

    #[tokio::test]
    async fn batch_computes_and_persists_pairs() {
        let (_dir, storage, mut db) = setup();
        let a1 = put_screen(&mut db, &storage, "Install", "en", "b1", &grey(10, 10), "a1");
        let a2 = put_screen(&mut db, &storage, "Login", "en", "b1", &grey(10, 10), "a2");
        let b1 = put_screen(&mut db, &storage, "Install", "ja", "b1", &grey_with_spot(10, 10), "b1");
        let b2 = put_screen(&mut db, &storage, "Login", "ja", "b1", &grey(10, 10), "b2");

        let reports = list_comparisons(&mut db, &storage, "shop", &coords("b1", "en"), &coords("b1", "ja"), 2)
            .await
            .unwrap();

        assert_eq!(reports.len(), 2);
        let install = row(&reports[0]);
        assert_eq!(install.source_id, a1.id);
        assert_eq!(install.target_id, Some(b1.id));
        assert!((install.difference - 0.01).abs() < 1e-12);
        assert_eq!(
            install.diff_path.as_deref(),
            Some(Storage::diff_rel(a1.id, b1.id).as_str())
        );

        let login = row(&reports[1]);
        assert_eq!(login.source_id, a2.id);
        assert_eq!(login.difference, 0.0);

        // Forward and reverse rows and artifacts for both computed pairs.
        for (s, t) in [(a1.id, b1.id), (a2.id, b2.id)] {
            assert!(db.comparison(s, t).unwrap().is_some());
            assert!(db.comparison(t, s).unwrap().is_some());
            assert!(storage.abs(&Storage::diff_rel(s, t)).exists());
            assert!(storage.abs(&Storage::diff_rel(t, s)).exists());
        }
    }

    #[tokio::test]
    async fn second_batch_run_hits_the_cache() {
        let (_dir, storage, mut db) = setup();
        put_screen(&mut db, &storage, "Install", "en", "b1", &grey(10, 10), "a1");
        let tgt = put_screen(&mut db, &storage, "Install", "ja", "b1", &grey_with_spot(10, 10), "b1");

        let first = list_comparisons(&mut db, &storage, "shop", &coords("b1", "en"), &coords("b1", "ja"), 4)
            .await
            .unwrap();
        let expected = row(&first[0]).difference;
        assert!(expected > 0.0);

        // Make the underlying files identical; a cache hit keeps the old ratio.
        let src = db.screens_in_build("shop", "en", "b1").unwrap().remove(0);
        std::fs::copy(storage.abs(&tgt.rel_path), storage.abs(&src.rel_path)).unwrap();

        let second = list_comparisons(&mut db, &storage, "shop", &coords("b1", "en"), &coords("b1", "ja"), 4)
            .await
            .unwrap();
        assert_eq!(row(&second[0]).difference, expected);
    }

    #[tokio::test]
    async fn missing_file_marks_only_its_pair() {
        let (_dir, storage, mut db) = setup();
        let broken = put_screen(&mut db, &storage, "Install", "en", "b1", &grey(4, 4), "a1");
        put_screen(&mut db, &storage, "Login", "en", "b1", &grey(4, 4), "a2");
        put_screen(&mut db, &storage, "Install", "ja", "b1", &grey(4, 4), "b1");
        put_screen(&mut db, &storage, "Login", "ja", "b1", &grey(4, 4), "b2");

        std::fs::remove_file(storage.abs(&broken.rel_path)).unwrap();

        let reports = list_comparisons(&mut db, &storage, "shop", &coords("b1", "en"), &coords("b1", "ja"), 4)
            .await
            .unwrap();

        assert_eq!(reports.len(), 2);
        match &reports[0] {
            PairReport::Failed(f) => {
                assert_eq!(f.source_screen, "Install");
                assert!(f.error.contains("missing"));
            }
            PairReport::Row(_) => panic!("expected the broken pair to fail"),
        }
        assert_eq!(row(&reports[1]).difference, 0.0);
    }
}
