use std::path::PathBuf;

use thiserror::Error;

/// Failures the comparison core can surface.
///
/// `Decode`, `MissingFile`, `ArtifactWrite` and `StorageWrite` are pair-level:
/// during a batch they mark a single entry and never abort sibling pairs.
/// `NotFound` and `Store` are request-level.
#[derive(Debug, Error)]
pub enum CompareError {
    #[error("cannot decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A screenshot file vanished from the storage tree.
    #[error("screenshot file missing: {0}")]
    MissingFile(PathBuf),

    #[error("cannot write diff artifact {path}: {source}")]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("storage write failed at {path}: {source}")]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown screenshot id {0}")]
    NotFound(i64),

    #[error("screenshot {id} does not belong to project {project}")]
    WrongProject { id: i64, project: String },

    #[error("comparison store: {0}")]
    Store(#[from] rusqlite::Error),

    /// A diff worker task died before reporting a result.
    #[error("diff worker failed: {0}")]
    Worker(String),
}
