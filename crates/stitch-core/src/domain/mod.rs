//! Domain - ドメインモデル（chunk key, merge id, report, request/response）

pub mod chunk;
pub mod errors;
pub mod ids;
pub mod report;
pub mod request;

pub use chunk::{ChunkIndex, ChunkKey, ChunkReceipt, FileName, TotalChunks};
pub use errors::ErrorKind;
pub use ids::MergeId;
pub use report::{ChunkFailure, ChunkStage, MergePhase, MergeReport};
pub use request::{ApiResponse, MergeChunksRequest, UploadChunkRequest};
