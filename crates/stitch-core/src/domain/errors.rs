//! Errors - 境界で返すエラー分類
//!
//! StitchError（crate::error）の詳細を、呼び出し側が扱える 3 種類に畳み込む。

use serde::{Deserialize, Serialize};

/// ErrorKind はレスポンスに載せるエラー分類
///
/// - InvalidRequest: 入力が壊れている（フィールド欠落、パース不能）
/// - FileMissing: upload の file part がない
/// - IoFailure: OS 境界での失敗（作成・読み込み・書き込み・削除）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    InvalidRequest,
    FileMissing,
    IoFailure,
}

impl ErrorKind {
    /// HTTP status a transport adapter should answer with.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::InvalidRequest | ErrorKind::FileMissing => 400,
            ErrorKind::IoFailure => 500,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::InvalidRequest => "invalid-request",
            ErrorKind::FileMissing => "file-missing",
            ErrorKind::IoFailure => "io-failure",
        };
        f.write_str(s)
    }
}
