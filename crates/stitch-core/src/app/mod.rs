//! App - アプリケーション層
//!
//! ports と impls を組み合わせて upload / merge / sweep を実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: 設定の検証とワイヤリング
//! - **ApiHandler**: リクエスト本文を受け取り ApiResponse を返す
//! - **MergeEngine**: chunk を index 順に結合する
//! - **Sweeper**: 一時ディレクトリの掃除
//! - **FileLocks**: file_name 単位の advisory lock

pub mod builder;
pub mod handler;
pub mod locks;
pub mod merge;
pub mod sweep;

pub use self::builder::{App, AppBuilder};
pub use self::handler::ApiHandler;
pub use self::locks::FileLocks;
pub use self::merge::MergeEngine;
pub use self::sweep::Sweeper;
