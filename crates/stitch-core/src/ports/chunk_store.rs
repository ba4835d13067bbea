//! ChunkStore port - chunk を一時領域に永続化する

use async_trait::async_trait;

use crate::domain::{ChunkKey, ChunkReceipt};
use crate::error::StitchError;
use crate::ports::ChunkReader;

/// ChunkStore は 1 つの chunk を `(file_name, index)` で決まる場所に書き込む
///
/// # 設計原則
/// - 呼び出し間で共有する可変状態を持たない（各呼び出しは別のパスに書く）
/// - 同じ key への再 upload は上書き（last-write-wins）
/// - 失敗はリトライせず、そのまま呼び出し側に返す
#[async_trait]
pub trait ChunkStore: Send + Sync {
    async fn store_chunk(
        &self,
        key: &ChunkKey,
        data: &mut ChunkReader,
    ) -> Result<ChunkReceipt, StitchError>;
}
