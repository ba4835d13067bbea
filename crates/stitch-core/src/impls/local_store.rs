//! LocalChunkStore - ローカルファイルシステム上の ChunkStore
//!
//! chunk は `<temp-dir>/<file_name>.part<index>` に書き込む。
//! 入力ストリームは固定サイズのバッファ経由でコピーするので、
//! chunk の大きさに関係なくメモリ使用量は一定。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufReader};
use tracing::debug;

use crate::app::FileLocks;
use crate::config::{StorageConfig, StorageLayout};
use crate::domain::{ChunkKey, ChunkReceipt};
use crate::error::StitchError;
use crate::ports::{ChunkReader, ChunkStore};

pub struct LocalChunkStore {
    layout: Arc<StorageLayout>,
    locks: FileLocks,
    copy_buffer_size: usize,
}

impl LocalChunkStore {
    /// Build a store over already-created directories.
    pub fn new(layout: Arc<StorageLayout>, locks: FileLocks, copy_buffer_size: usize) -> Self {
        Self {
            layout,
            locks,
            copy_buffer_size,
        }
    }

    /// Validate `config`, create its directories and build a store.
    pub async fn open(config: &StorageConfig, locks: FileLocks) -> Result<Self, StitchError> {
        config.validate()?;
        let layout = config.layout();
        layout.ensure_dirs().await?;
        Ok(Self::new(Arc::new(layout), locks, config.copy_buffer_size))
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }
}

#[async_trait]
impl ChunkStore for LocalChunkStore {
    async fn store_chunk(
        &self,
        key: &ChunkKey,
        data: &mut ChunkReader,
    ) -> Result<ChunkReceipt, StitchError> {
        // merge / sweep はこの間、同じ file_name の artifact に触れない
        let _guard = self.locks.shared(key.file_name()).await;

        let path = self.layout.chunk_path(key);
        let mut file = File::create(&path)
            .await
            .map_err(|source| StitchError::CreateArtifact {
                path: path.clone(),
                source,
            })?;

        let mut reader = BufReader::with_capacity(self.copy_buffer_size, data);
        let bytes_written = tokio::io::copy_buf(&mut reader, &mut file)
            .await
            .map_err(|source| StitchError::WriteChunk {
                path: path.clone(),
                source,
            })?;
        file.flush()
            .await
            .map_err(|source| StitchError::WriteChunk {
                path: path.clone(),
                source,
            })?;

        debug!(
            file_name = %key.file_name(),
            chunk_index = key.index().get(),
            bytes = bytes_written,
            "chunk stored"
        );

        Ok(ChunkReceipt {
            file_name: key.file_name().to_string(),
            chunk_index: key.index().get(),
            bytes_written,
            artifact_path: path,
        })
    }
}
