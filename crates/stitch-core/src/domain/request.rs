//! リクエスト本文とレスポンスの形
//!
//! フィールド名（`chunk_index`, `file_name`, `total_chunks`）と
//! `{error, message, details, file}` の形は既存のクライアントが使っているので変えない。
//!
//! # 本文の形式
//! - `{` で始まれば JSON
//! - それ以外は `application/x-www-form-urlencoded`（フォームの値は常に文字列）

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use super::chunk::{ChunkIndex, FileName, TotalChunks};
use super::errors::ErrorKind;
use crate::error::StitchError;

/// Form fields accompanying one chunk upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadChunkRequest {
    #[serde(deserialize_with = "int_or_string")]
    pub chunk_index: i64,
}

impl UploadChunkRequest {
    pub fn parse(body: &[u8]) -> Result<Self, StitchError> {
        decode_body(body)
    }

    pub fn chunk_index(&self) -> Result<ChunkIndex, StitchError> {
        u64::try_from(self.chunk_index)
            .map(ChunkIndex::new)
            .map_err(|_| {
                StitchError::InvalidRequest(format!(
                    "chunk_index must be non-negative, got {}",
                    self.chunk_index
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MergeChunksRequest {
    pub file_name: String,
    #[serde(deserialize_with = "int_or_string")]
    pub total_chunks: i64,
}

impl MergeChunksRequest {
    pub fn parse(body: &[u8]) -> Result<Self, StitchError> {
        decode_body(body)
    }

    pub fn validate(&self) -> Result<(FileName, TotalChunks), StitchError> {
        let file_name = FileName::new(self.file_name.clone())?;
        let total = u64::try_from(self.total_chunks).map_err(|_| {
            StitchError::InvalidRequest(format!(
                "total_chunks must be positive, got {}",
                self.total_chunks
            ))
        })?;
        Ok((file_name, TotalChunks::new(total)?))
    }
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, StitchError> {
    let is_json = body
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|&b| b == b'{');
    if is_json {
        serde_json::from_slice(body).map_err(|e| StitchError::InvalidRequest(e.to_string()))
    } else {
        serde_urlencoded::from_bytes(body).map_err(|e| StitchError::InvalidRequest(e.to_string()))
    }
}

/// Form transports hand numbers over as strings; accept both.
fn int_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i64),
        Str(String),
    }

    match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(v) => Ok(v),
        IntOrString::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Response envelope returned for every call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub error: bool,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// Echoed file name on upload success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl ApiResponse {
    pub fn uploaded(file_name: impl Into<String>) -> Self {
        Self {
            error: false,
            message: "File uploaded successfully".into(),
            kind: None,
            details: None,
            file: Some(file_name.into()),
        }
    }

    pub fn merged() -> Self {
        Self {
            error: false,
            message: "Chunks merged successfully".into(),
            kind: None,
            details: None,
            file: None,
        }
    }

    pub fn failure(err: &StitchError) -> Self {
        Self {
            error: true,
            message: err.summary().into(),
            kind: Some(err.kind()),
            details: Some(err.to_string()),
            file: None,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind.map_or(200, ErrorKind::status_code)
    }
}
