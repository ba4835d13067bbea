//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）: 設定ミスやディレクトリ作成失敗は
//!   最初のリクエストではなく build() で分かる
//! - ChunkStore と MergeEngine は同じ FileLocks を共有する

use std::sync::Arc;

use crate::app::{ApiHandler, FileLocks, MergeEngine};
use crate::config::StorageConfig;
use crate::error::StitchError;
use crate::impls::LocalChunkStore;
use crate::ports::{Clock, IdGenerator, SystemClock, UlidGenerator};

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new()
///     .config(StorageConfig::from_env()?)
///     .build()
///     .await?;
/// let handler = app.handler();
/// ```
pub struct AppBuilder {
    config: StorageConfig,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl AppBuilder {
    /// デフォルト設定（`./temp`, `./uploads`）で AppBuilder を作成
    pub fn new() -> Self {
        Self {
            config: StorageConfig::default(),
            clock: Arc::new(SystemClock),
            ids: Arc::new(UlidGenerator::new(SystemClock)),
        }
    }

    pub fn config(mut self, config: StorageConfig) -> Self {
        self.config = config;
        self
    }

    /// MergeReport のタイムスタンプに使う Clock（テストでは FixedClock）
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// 設定を検証し、ディレクトリを作成して App を生成
    ///
    /// # 検証
    /// - StorageConfig::validate() が通らなければ StitchError::Config
    /// - ディレクトリが作れなければ StitchError::CreateDir
    pub async fn build(self) -> Result<App, StitchError> {
        let locks = FileLocks::new();
        let store = LocalChunkStore::open(&self.config, locks.clone()).await?;
        let layout = Arc::new(store.layout().clone());
        let engine = MergeEngine::new(
            layout,
            locks.clone(),
            self.config.max_in_flight,
            self.clock,
            self.ids,
        );
        Ok(App {
            store: Arc::new(store),
            engine: Arc::new(engine),
            locks,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// App は構築済みのアプリケーション
pub struct App {
    store: Arc<LocalChunkStore>,
    engine: Arc<MergeEngine>,
    locks: FileLocks,
}

impl App {
    pub fn handler(&self) -> ApiHandler {
        ApiHandler::new(self.store.clone(), Arc::clone(&self.engine))
    }

    pub fn store(&self) -> Arc<LocalChunkStore> {
        Arc::clone(&self.store)
    }

    pub fn engine(&self) -> Arc<MergeEngine> {
        Arc::clone(&self.engine)
    }

    pub fn locks(&self) -> &FileLocks {
        &self.locks
    }

    /// merge とは独立に一時ディレクトリを掃除する。使用中の file_name は残す。
    pub async fn sweep_orphans(&self) -> Result<usize, StitchError> {
        self.engine.sweeper().sweep(None).await
    }
}
