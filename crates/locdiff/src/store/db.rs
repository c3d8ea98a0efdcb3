use std::collections::HashMap;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::debug;

use super::Storage;
use crate::error::CompareError;

const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS screenshots (
  id           INTEGER PRIMARY KEY,
  project      TEXT NOT NULL,
  screen       TEXT NOT NULL,
  locale       TEXT NOT NULL,
  build        TEXT NOT NULL,
  rel_path     TEXT NOT NULL,
  content_hash TEXT NOT NULL,
  revision     INTEGER NOT NULL DEFAULT 1,
  created_at   TEXT NOT NULL DEFAULT (datetime('now')),
  UNIQUE (project, screen, locale, build)
);
CREATE TABLE IF NOT EXISTS screenshot_revisions (
  screenshot_id INTEGER NOT NULL REFERENCES screenshots(id),
  revision      INTEGER NOT NULL,
  rel_path      TEXT NOT NULL,
  content_hash  TEXT NOT NULL,
  recorded_at   TEXT NOT NULL DEFAULT (datetime('now')),
  PRIMARY KEY (screenshot_id, revision)
);
CREATE TABLE IF NOT EXISTS comparisons (
  source_id   INTEGER NOT NULL,
  target_id   INTEGER NOT NULL,
  difference  REAL NOT NULL,
  diff_path   TEXT,
  source_hash TEXT NOT NULL,
  target_hash TEXT NOT NULL,
  created_at  TEXT NOT NULL DEFAULT (datetime('now')),
  PRIMARY KEY (source_id, target_id)
);
";

const SCREENSHOT_COLS: &str = "id, project, screen, locale, build, rel_path, content_hash, revision";

/// One registered screenshot: a rendered screen in a (project, locale, build).
#[derive(Debug, Clone)]
pub struct ScreenshotRecord {
    pub id: i64,
    pub project: String,
    pub screen: String,
    pub locale: String,
    pub build: String,
    pub rel_path: String,
    pub content_hash: String,
    pub revision: i64,
}

/// Persisted outcome of comparing an ordered screenshot pair.
#[derive(Debug, Clone)]
pub struct ComparisonRecord {
    pub source_id: i64,
    pub target_id: i64,
    pub difference: f64,
    pub diff_path: Option<String>,
    pub source_hash: String,
    pub target_hash: String,
}

impl ComparisonRecord {
    /// The mirrored row: swapped ids and hashes, identical difference.
    pub fn reversed(&self) -> Self {
        Self {
            source_id: self.target_id,
            target_id: self.source_id,
            difference: self.difference,
            diff_path: self
                .diff_path
                .as_ref()
                .map(|_| Storage::diff_rel(self.target_id, self.source_id)),
            source_hash: self.target_hash.clone(),
            target_hash: self.source_hash.clone(),
        }
    }
}

/// Result of registering a screenshot upload.
pub enum UploadOutcome {
    /// First upload at these coordinates.
    Created(ScreenshotRecord),
    /// Re-upload: previous state snapshotted, revision bumped.
    Revised(ScreenshotRecord),
}

fn screenshot_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScreenshotRecord> {
    Ok(ScreenshotRecord {
        id: row.get(0)?,
        project: row.get(1)?,
        screen: row.get(2)?,
        locale: row.get(3)?,
        build: row.get(4)?,
        rel_path: row.get(5)?,
        content_hash: row.get(6)?,
        revision: row.get(7)?,
    })
}

fn comparison_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ComparisonRecord> {
    Ok(ComparisonRecord {
        source_id: row.get(0)?,
        target_id: row.get(1)?,
        difference: row.get(2)?,
        diff_path: row.get(3)?,
        source_hash: row.get(4)?,
        target_hash: row.get(5)?,
    })
}

/// SQLite-backed store for screenshot metadata and comparison results.
pub struct Db {
    conn: Connection,
}

impl Db {
    /// Open (creating if needed) the comparison database.
    pub fn open(path: &Path) -> Result<Self, CompareError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CompareError::StorageWrite {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, CompareError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, CompareError> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        conn.execute_batch(&format!("PRAGMA user_version={SCHEMA_VERSION};"))?;
        Ok(Self { conn })
    }

    /// Register an uploaded screenshot.
    ///
    /// First upload at (project, screen, locale, build) inserts a fresh row at
    /// revision 1. A re-upload appends an immutable snapshot of the superseded
    /// state to `screenshot_revisions`, then bumps the live row; the next
    /// revision number comes from the table's current maximum, inside the same
    /// transaction.
    pub fn record_screenshot(
        &mut self,
        project: &str,
        screen: &str,
        locale: &str,
        build: &str,
        rel_path: &str,
        content_hash: &str,
    ) -> Result<UploadOutcome, CompareError> {
        let tx = self.conn.transaction()?;

        let existing = tx
            .query_row(
                "SELECT id, rel_path, content_hash, revision FROM screenshots
                 WHERE project = ?1 AND screen = ?2 AND locale = ?3 AND build = ?4",
                params![project, screen, locale, build],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        let outcome = match existing {
            None => {
                tx.execute(
                    "INSERT INTO screenshots (project, screen, locale, build, rel_path, content_hash)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![project, screen, locale, build, rel_path, content_hash],
                )?;
                let id = tx.last_insert_rowid();
                UploadOutcome::Created(ScreenshotRecord {
                    id,
                    project: project.to_string(),
                    screen: screen.to_string(),
                    locale: locale.to_string(),
                    build: build.to_string(),
                    rel_path: rel_path.to_string(),
                    content_hash: content_hash.to_string(),
                    revision: 1,
                })
            }
            Some((id, prev_rel, prev_hash, prev_revision)) => {
                tx.execute(
                    "INSERT INTO screenshot_revisions (screenshot_id, revision, rel_path, content_hash)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![id, prev_revision, prev_rel, prev_hash],
                )?;
                let max_rev: i64 = tx.query_row(
                    "SELECT MAX(revision) FROM screenshot_revisions WHERE screenshot_id = ?1",
                    params![id],
                    |row| row.get(0),
                )?;
                let revision = max_rev + 1;
                tx.execute(
                    "UPDATE screenshots SET content_hash = ?2, revision = ?3 WHERE id = ?1",
                    params![id, content_hash, revision],
                )?;
                debug!(id, revision, "screenshot re-uploaded");
                UploadOutcome::Revised(ScreenshotRecord {
                    id,
                    project: project.to_string(),
                    screen: screen.to_string(),
                    locale: locale.to_string(),
                    build: build.to_string(),
                    rel_path: rel_path.to_string(),
                    content_hash: content_hash.to_string(),
                    revision,
                })
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    pub fn screenshot(&self, id: i64) -> Result<Option<ScreenshotRecord>, CompareError> {
        self.conn
            .query_row(
                &format!("SELECT {SCREENSHOT_COLS} FROM screenshots WHERE id = ?1"),
                params![id],
                screenshot_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// All screenshots of one (project, locale, build), ordered by screen name.
    pub fn screens_in_build(
        &self,
        project: &str,
        locale: &str,
        build: &str,
    ) -> Result<Vec<ScreenshotRecord>, CompareError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SCREENSHOT_COLS} FROM screenshots
             WHERE project = ?1 AND locale = ?2 AND build = ?3
             ORDER BY screen"
        ))?;
        let rows = stmt.query_map(params![project, locale, build], screenshot_from_row)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    pub fn comparison(
        &self,
        source_id: i64,
        target_id: i64,
    ) -> Result<Option<ComparisonRecord>, CompareError> {
        self.conn
            .query_row(
                "SELECT source_id, target_id, difference, diff_path, source_hash, target_hash
                 FROM comparisons WHERE source_id = ?1 AND target_id = ?2",
                params![source_id, target_id],
                comparison_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Bulk prefetch: every comparison row whose source id is in `ids`.
    pub fn comparisons_for_sources(
        &self,
        ids: &[i64],
    ) -> Result<HashMap<(i64, i64), ComparisonRecord>, CompareError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT source_id, target_id, difference, diff_path, source_hash, target_hash
             FROM comparisons WHERE source_id IN ({placeholders})"
        ))?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), comparison_from_row)?;
        let mut map = HashMap::new();
        for row in rows {
            let rec = row?;
            map.insert((rec.source_id, rec.target_id), rec);
        }
        Ok(map)
    }

    /// Persist the forward and reverse rows together.
    ///
    /// `INSERT OR REPLACE` makes a concurrent duplicate computation overwrite
    /// the row with identical values instead of failing on the primary key.
    pub fn upsert_comparison_pair(
        &mut self,
        forward: &ComparisonRecord,
    ) -> Result<(), CompareError> {
        let reverse = forward.reversed();
        let tx = self.conn.transaction()?;
        for rec in [forward, &reverse] {
            tx.execute(
                "INSERT OR REPLACE INTO comparisons
                 (source_id, target_id, difference, diff_path, source_hash, target_hash)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    rec.source_id,
                    rec.target_id,
                    rec.difference,
                    rec.diff_path,
                    rec.source_hash,
                    rec.target_hash
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}
