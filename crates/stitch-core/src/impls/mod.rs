//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **LocalChunkStore**: ローカルファイルシステムの ChunkStore
//! - **BytesPart / PathPart**: メモリ上のバイト列・ローカルファイルを UploadPart として渡す

pub mod local_store;
pub mod upload_part;

pub use self::local_store::LocalChunkStore;
pub use self::upload_part::{BytesPart, PathPart};
