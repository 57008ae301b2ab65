//! Error types for the ingestion boundary.

use std::path::PathBuf;

/// A field specification that can never match anything.
///
/// Raised by [`crate::FieldSpec::new`], never during extraction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpecError {
    #[error("field specification has no label synonyms")]
    NoSynonyms,
    #[error("field specification contains a blank synonym at position {index}")]
    BlankSynonym { index: usize },
    #[error("field specification does not compile: {0}")]
    Pattern(String),
}

/// Failures reading or decoding an origin.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not valid UTF-8", .path.display())]
    Decode { path: PathBuf },
    #[error("pairings folder not found: {}", .path.display())]
    RootNotFound { path: PathBuf },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing required column `{column}`")]
    MissingColumn { column: String },
    #[error("invalid timestamp `{value}`")]
    Timestamp { value: String },
}

impl IngestError {
    /// Classify a read failure for `path`, separating decode errors from plain IO.
    pub(crate) fn from_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::InvalidData {
            IngestError::Decode { path }
        } else {
            IngestError::Io { path, source }
        }
    }
}
