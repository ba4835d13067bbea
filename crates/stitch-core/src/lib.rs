//! stitch-core
//!
//! 分割アップロードのコア: chunk を保存し、1 つのファイルに結合し、残りを掃除する。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（chunk key, merge id, report, request/response, error kind）
//! - **ports**: 抽象化レイヤー（ChunkStore, UploadPart, Clock, IdGenerator）
//! - **impls**: 実装（LocalChunkStore, BytesPart, PathPart）
//! - **app**: アプリケーションロジック（builder, merge engine, sweeper, file locks, handler）
//! - **config**: ディレクトリ構成と調整値
//! - **observability**: tracing の初期化と merge report のログ出力

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod observability;
pub mod ports;

pub use app::{App, AppBuilder, ApiHandler, MergeEngine};
pub use config::{StorageConfig, StorageLayout};
pub use error::StitchError;
