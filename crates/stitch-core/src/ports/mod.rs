//! Ports - 抽象化レイヤー
//!
//! ストレージ・アップロード元・時刻・ID 生成を trait として切り出す。
//! 実装は `impls` に置き、テストでは差し替える。

pub mod chunk_store;
pub mod clock;
pub mod id_generator;
pub mod upload;

pub use self::chunk_store::ChunkStore;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::upload::{ChunkReader, UploadPart};
