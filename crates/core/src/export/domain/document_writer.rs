use std::path::{Path, PathBuf};

use thiserror::Error;

use super::detection_document::OutputDocument;

#[derive(Error, Debug)]
pub enum DocumentWriteError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize detections: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persists a finished export in one write.
///
/// No atomicity is promised: a crash mid-write may leave a truncated file.
pub trait DocumentWriter: Send {
    fn write(&mut self, document: &OutputDocument, path: &Path) -> Result<(), DocumentWriteError>;
}
