//! MergeReport - 1 回の merge で実際に起きたこと
//!
//! レスポンスは「merged」としか言わないので、どの index が出力に入り
//! どれがスキップされたかはここに残す（ログとライブラリ利用者向け）。

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::MergeId;

/// Phases of one merge invocation.
///
/// # 状態遷移
/// - CreatingOutput → Merging → Sweeping → Done
/// - CreatingOutput / Sweeping は Failed に遷移しうる
/// - Merging は個々の chunk が失敗しても必ず Sweeping に進む
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePhase {
    CreatingOutput,
    Merging,
    Sweeping,
    Done,
    Failed,
}

impl fmt::Display for MergePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MergePhase::CreatingOutput => "creating_output",
            MergePhase::Merging => "merging",
            MergePhase::Sweeping => "sweeping",
            MergePhase::Done => "done",
            MergePhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Step at which a single chunk was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStage {
    Read,
    Write,
    /// Bytes reached the output, but the artifact could not be removed.
    Delete,
    /// The reader went away without handing anything over.
    Unreported,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkFailure {
    pub index: u64,
    pub stage: ChunkStage,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeReport {
    pub merge_id: MergeId,
    pub file_name: String,
    pub total_chunks: u64,

    /// Indices whose bytes were written, ascending.
    pub merged: Vec<u64>,

    /// Indices with no artifact on disk.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<u64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ChunkFailure>,

    pub bytes_written: u64,

    /// Temp artifacts removed by the sweep (any file name).
    pub swept: usize,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl MergeReport {
    /// True when every declared chunk landed in the output.
    pub fn is_complete(&self) -> bool {
        self.merged.len() as u64 == self.total_chunks
    }

    /// Indices that were declared but are not in the output.
    pub fn omitted(&self) -> Vec<u64> {
        let mut omitted: Vec<u64> = self
            .missing
            .iter()
            .copied()
            .chain(
                self.failures
                    .iter()
                    .filter(|f| f.stage != ChunkStage::Delete)
                    .map(|f| f.index),
            )
            .collect();
        omitted.sort_unstable();
        omitted.dedup();
        omitted
    }
}
