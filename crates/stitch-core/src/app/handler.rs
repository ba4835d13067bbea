//! ApiHandler - transport に見せる境界
//!
//! transport（HTTP など）はリクエストからフィールドを取り出すだけで、
//! 検証・保存・merge・レスポンス組み立てはここで行う。

use std::sync::Arc;

use tracing::warn;

use crate::app::MergeEngine;
use crate::domain::{
    ApiResponse, ChunkKey, ChunkReceipt, FileName, MergeChunksRequest, MergeReport,
    UploadChunkRequest,
};
use crate::error::StitchError;
use crate::ports::{ChunkStore, UploadPart};

#[derive(Clone)]
pub struct ApiHandler {
    store: Arc<dyn ChunkStore>,
    engine: Arc<MergeEngine>,
}

impl ApiHandler {
    pub fn new(store: Arc<dyn ChunkStore>, engine: Arc<MergeEngine>) -> Self {
        Self { store, engine }
    }

    /// `body` carries `chunk_index`; `file` is the uploaded part, if any.
    pub async fn upload_file(
        &self,
        body: &[u8],
        file: Option<Box<dyn UploadPart>>,
    ) -> ApiResponse {
        match self.store_part(body, file).await {
            Ok(receipt) => ApiResponse::uploaded(receipt.file_name),
            Err(e) => {
                warn!(kind = %e.kind(), error = %e, "upload rejected");
                ApiResponse::failure(&e)
            }
        }
    }

    /// `body` carries `file_name` and `total_chunks`.
    pub async fn merge_chunks(&self, body: &[u8]) -> ApiResponse {
        match self.merge(body).await {
            Ok(_) => ApiResponse::merged(),
            Err(e) => {
                warn!(kind = %e.kind(), error = %e, "merge rejected");
                ApiResponse::failure(&e)
            }
        }
    }

    pub async fn store_part(
        &self,
        body: &[u8],
        file: Option<Box<dyn UploadPart>>,
    ) -> Result<ChunkReceipt, StitchError> {
        let request = UploadChunkRequest::parse(body)?;
        let index = request.chunk_index()?;
        let part =
            file.ok_or_else(|| StitchError::FileMissing("request has no `file` part".into()))?;

        let file_name = FileName::new(part.file_name())?;
        let key = ChunkKey::new(file_name, index);
        let mut reader = part.open().map_err(|source| StitchError::OpenUpload {
            file_name: key.file_name().to_string(),
            source,
        })?;
        self.store.store_chunk(&key, &mut *reader).await
    }

    pub async fn merge(&self, body: &[u8]) -> Result<MergeReport, StitchError> {
        let request = MergeChunksRequest::parse(body)?;
        let (file_name, total) = request.validate()?;
        self.engine.merge_chunks(&file_name, total).await
    }
}
