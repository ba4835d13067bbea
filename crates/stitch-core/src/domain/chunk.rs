//! Chunk - chunk の識別子と artifact の命名規則
//!
//! # 命名規則
//! artifact 名は `<file_name>.part<index>`。index は 0 埋めなしの 10 進数。
//! 一時ディレクトリを読む他のツールと共有する名前なので変えない。

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::StitchError;

const PART_MARKER: &str = ".part";

/// Caller-declared logical file name.
///
/// Only emptiness is rejected. Path separators and `..` pass through
/// untouched; rejecting them is the transport's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileName(String);

impl FileName {
    pub fn new(name: impl Into<String>) -> Result<Self, StitchError> {
        let name = name.into();
        if name.is_empty() {
            return Err(StitchError::InvalidRequest(
                "file name must not be empty".into(),
            ));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FileName {
    type Error = StitchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FileName> for String {
    fn from(value: FileName) -> Self {
        value.0
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position of a chunk within its logical file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkIndex(u64);

impl ChunkIndex {
    pub fn new(index: u64) -> Self {
        Self(index)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChunkIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declared number of chunks of a logical file (at least one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct TotalChunks(u64);

impl TotalChunks {
    pub fn new(total: u64) -> Result<Self, StitchError> {
        if total == 0 {
            return Err(StitchError::InvalidRequest(
                "total_chunks must be at least 1".into(),
            ));
        }
        Ok(Self(total))
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Every index `[0, total)` in ascending order.
    pub fn indices(self) -> impl Iterator<Item = ChunkIndex> {
        (0..self.0).map(ChunkIndex::new)
    }
}

impl TryFrom<u64> for TotalChunks {
    type Error = StitchError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TotalChunks> for u64 {
    fn from(value: TotalChunks) -> Self {
        value.0
    }
}

/// (file name, chunk index) pair identifying one chunk artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChunkKey {
    file_name: FileName,
    index: ChunkIndex,
}

impl ChunkKey {
    pub fn new(file_name: FileName, index: ChunkIndex) -> Self {
        Self { file_name, index }
    }

    pub fn file_name(&self) -> &FileName {
        &self.file_name
    }

    pub fn index(&self) -> ChunkIndex {
        self.index
    }

    /// `<file_name>.part<index>`
    pub fn artifact_name(&self) -> String {
        format!("{}{}{}", self.file_name, PART_MARKER, self.index)
    }

    /// Inverse of [`ChunkKey::artifact_name`].
    ///
    /// Splits on the last `.part` and requires the rest to be plain digits,
    /// so `a.part1.part2` belongs to `a.part1`. Returns `None` for names that
    /// only match the sweep glob loosely (e.g. `notes.partial`).
    pub fn parse_artifact_name(name: &str) -> Option<Self> {
        let (file_name, index) = name.rsplit_once(PART_MARKER)?;
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let index = index.parse::<u64>().ok()?;
        let file_name = FileName::new(file_name).ok()?;
        Some(Self::new(file_name, ChunkIndex::new(index)))
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.artifact_name())
    }
}

/// What a successful chunk store reports back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkReceipt {
    /// Original file name, echoed for confirmation.
    pub file_name: String,
    pub chunk_index: u64,
    pub bytes_written: u64,
    pub artifact_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn key(name: &str, index: u64) -> ChunkKey {
        ChunkKey::new(FileName::new(name).unwrap(), ChunkIndex::new(index))
    }

    #[test]
    fn empty_file_name_is_rejected() {
        assert!(matches!(
            FileName::new(""),
            Err(StitchError::InvalidRequest(_))
        ));
    }

    #[test]
    fn traversal_is_not_sanitized() {
        let name = FileName::new("../escape.bin").unwrap();
        assert_eq!(name.as_str(), "../escape.bin");
    }

    #[test]
    fn zero_total_is_rejected() {
        assert!(TotalChunks::new(0).is_err());
        let total = TotalChunks::new(3).unwrap();
        let indices: Vec<u64> = total.indices().map(ChunkIndex::get).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[rstest]
    #[case::first("doc.txt", 0, "doc.txt.part0")]
    #[case::no_padding("doc.txt", 12, "doc.txt.part12")]
    #[case::no_extension("blob", 7, "blob.part7")]
    fn artifact_name_is_unpadded(#[case] name: &str, #[case] index: u64, #[case] expected: &str) {
        assert_eq!(key(name, index).artifact_name(), expected);
    }

    #[rstest]
    #[case::plain("doc.txt.part3", Some(("doc.txt", 3)))]
    #[case::nested_marker("a.part1.part2", Some(("a.part1", 2)))]
    #[case::no_digits("notes.partial", None)]
    #[case::signed("doc.part+1", None)]
    #[case::empty_name(".part4", None)]
    #[case::no_marker("doc.txt", None)]
    fn parse_artifact_names(#[case] input: &str, #[case] expected: Option<(&str, u64)>) {
        let parsed = ChunkKey::parse_artifact_name(input);
        assert_eq!(parsed, expected.map(|(n, i)| key(n, i)));
    }

    #[test]
    fn file_name_deserialization_validates() {
        let ok: FileName = serde_json::from_str("\"a.bin\"").unwrap();
        assert_eq!(ok.as_str(), "a.bin");
        assert!(serde_json::from_str::<FileName>("\"\"").is_err());
    }
}
