//! StitchError - 失敗箇所ごとのエラー
//!
//! `kind()` で境界の 3 分類に、`summary()` でレスポンスのメッセージに変換する。

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::domain::ErrorKind;

#[derive(Debug, Error)]
pub enum StitchError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("file part missing: {0}")]
    FileMissing(String),

    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create chunk artifact {}: {source}", path.display())]
    CreateArtifact {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to open uploaded part {file_name}: {source}")]
    OpenUpload {
        file_name: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write chunk artifact {}: {source}", path.display())]
    WriteChunk {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create output file {}: {source}", path.display())]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to list temp files: {0}")]
    ListTemp(String),

    #[error("failed to remove temp file {}: {source}", path.display())]
    Sweep {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("merge task failed: {0}")]
    TaskJoin(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl StitchError {
    /// Classify for the boundary response.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StitchError::InvalidRequest(_) | StitchError::Config(_) => ErrorKind::InvalidRequest,
            StitchError::FileMissing(_) => ErrorKind::FileMissing,
            StitchError::CreateDir { .. }
            | StitchError::CreateArtifact { .. }
            | StitchError::OpenUpload { .. }
            | StitchError::WriteChunk { .. }
            | StitchError::CreateOutput { .. }
            | StitchError::ListTemp(_)
            | StitchError::Sweep { .. }
            | StitchError::TaskJoin(_) => ErrorKind::IoFailure,
        }
    }

    /// Short, human-readable headline used as the response `message`.
    pub fn summary(&self) -> &'static str {
        match self {
            StitchError::InvalidRequest(_) => "Invalid request data",
            StitchError::FileMissing(_) => "File upload failed",
            StitchError::CreateDir { .. } => "Failed to prepare storage directories",
            StitchError::CreateArtifact { .. } => "Failed to create temporary file",
            StitchError::OpenUpload { .. } => "Failed to open uploaded file",
            StitchError::WriteChunk { .. } => "Failed to write file chunk",
            StitchError::CreateOutput { .. } => "Failed to create output file",
            StitchError::ListTemp(_) | StitchError::Sweep { .. } => {
                "Failed to clean up temporary files"
            }
            StitchError::TaskJoin(_) => "Failed to merge chunks",
            StitchError::Config(_) => "Invalid storage configuration",
        }
    }
}
