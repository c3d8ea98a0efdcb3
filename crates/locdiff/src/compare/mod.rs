pub mod cache;
pub mod diff;

use serde::Serialize;

use crate::store::db::{ComparisonRecord, ScreenshotRecord};

/// One entry of a comparison result set, shaped for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonRow {
    pub source_id: i64,
    pub source_screen: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_screen: Option<String>,
    pub difference: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_path: Option<String>,
}

impl ComparisonRow {
    /// Synthesized self-comparison: difference 0, no artifact, never persisted.
    pub fn self_same(screen: &ScreenshotRecord) -> Self {
        Self {
            source_id: screen.id,
            source_screen: screen.screen.clone(),
            target_id: Some(screen.id),
            target_screen: Some(screen.screen.clone()),
            difference: 0.0,
            diff_path: None,
        }
    }

    /// Sentinel for a screen with no counterpart in the target set.
    /// Models complete absence, not a computed worst-case diff.
    pub fn missing_counterpart(source: &ScreenshotRecord) -> Self {
        Self {
            source_id: source.id,
            source_screen: source.screen.clone(),
            target_id: None,
            target_screen: None,
            difference: 1.0,
            diff_path: None,
        }
    }

    pub fn from_record(
        record: &ComparisonRecord,
        source: &ScreenshotRecord,
        target: &ScreenshotRecord,
    ) -> Self {
        Self {
            source_id: record.source_id,
            source_screen: source.screen.clone(),
            target_id: Some(record.target_id),
            target_screen: Some(target.screen.clone()),
            difference: record.difference,
            diff_path: record.diff_path.clone(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.target_id.is_none()
    }
}

/// Batch entry: a comparison row, or the error that kept the pair from being
/// compared. Failures never abort sibling pairs.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PairReport {
    Row(ComparisonRow),
    Failed(PairFailure),
}

#[derive(Debug, Clone, Serialize)]
pub struct PairFailure {
    pub source_id: i64,
    pub source_screen: String,
    pub error: String,
}
