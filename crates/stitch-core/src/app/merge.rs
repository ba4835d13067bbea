//! MergeEngine - chunk を読み集めて 1 つのファイルに書き戻す
//!
//! # フロー
//! 1. file_name の exclusive lock を取る
//! 2. `<final-dir>/<file_name>` を truncate して作る（失敗したら全体が失敗）
//! 3. reader pool が chunk を並行に読み、writer task に channel で渡す
//! 4. writer は index 昇順でのみ書く。先に届いた chunk は穴が埋まるまで保持する
//! 5. 全 task の終了を待ってから sweep（失敗したら全体が失敗）
//!
//! 個々の chunk の失敗（存在しない、読めない、書けない、消せない）はログに残して
//! スキップするだけで、merge 自体は成功として返る。
//!
//! # メモリ上限
//! reader は読む前に semaphore の permit を取り、permit は writer が書き終えるまで
//! 手放さない。同時にメモリ上にある chunk は最大 `max_in_flight` 個。
//! permit は index 順に払い出すので、writer が待っている最小 index は必ず
//! 読み込み中であり、穴で詰まることはない。

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tokio::task::{JoinError, JoinSet};
use tracing::{Instrument, debug, info_span, warn};

use crate::app::{FileLocks, Sweeper};
use crate::config::StorageLayout;
use crate::domain::{
    ChunkFailure, ChunkKey, ChunkStage, FileName, MergePhase, MergeReport, TotalChunks,
};
use crate::error::StitchError;
use crate::observability::log_merge_report;
use crate::ports::{Clock, IdGenerator};

pub struct MergeEngine {
    layout: Arc<StorageLayout>,
    locks: FileLocks,
    sweeper: Sweeper,
    max_in_flight: usize,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

/// One chunk as handed from a reader to the writer.
struct ChunkRead {
    index: u64,
    path: PathBuf,
    outcome: ReadOutcome,
    // released once the writer is done with the bytes
    _permit: OwnedSemaphorePermit,
}

enum ReadOutcome {
    Bytes(Vec<u8>),
    Missing,
    Failed(io::Error),
}

/// What the writer saw while draining the channel.
#[derive(Debug, Default)]
struct WriteTally {
    merged: Vec<u64>,
    missing: Vec<u64>,
    failures: Vec<ChunkFailure>,
    bytes_written: u64,
}

impl MergeEngine {
    pub fn new(
        layout: Arc<StorageLayout>,
        locks: FileLocks,
        max_in_flight: usize,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        let sweeper = Sweeper::new(Arc::clone(&layout), locks.clone());
        Self {
            layout,
            locks,
            sweeper,
            max_in_flight: max_in_flight.max(1),
            clock,
            ids,
        }
    }

    pub fn sweeper(&self) -> &Sweeper {
        &self.sweeper
    }

    /// Assemble `total` chunks of `file_name` into `<final-dir>/<file_name>`.
    pub async fn merge_chunks(
        &self,
        file_name: &FileName,
        total: TotalChunks,
    ) -> Result<MergeReport, StitchError> {
        let merge_id = self.ids.generate_merge_id();
        let span = info_span!(
            "merge",
            %merge_id,
            file_name = %file_name,
            total_chunks = total.get()
        );

        async move {
            let _guard = self.locks.exclusive(file_name).await;
            let started_at = self.clock.now();

            debug!(phase = %MergePhase::CreatingOutput, "merge phase");
            let out_path = self.layout.output_path(file_name);
            let output = File::create(&out_path).await.map_err(|source| {
                warn!(phase = %MergePhase::Failed, error = %source, "cannot create output");
                StitchError::CreateOutput {
                    path: out_path.clone(),
                    source,
                }
            })?;

            debug!(phase = %MergePhase::Merging, "merge phase");
            let tally = self.consume_chunks(file_name, total, output).await?;

            debug!(phase = %MergePhase::Sweeping, "merge phase");
            let swept = self.sweeper.sweep(Some(file_name)).await.inspect_err(|e| {
                warn!(phase = %MergePhase::Failed, error = %e, "sweep failed");
            })?;

            let report = MergeReport {
                merge_id,
                file_name: file_name.to_string(),
                total_chunks: total.get(),
                merged: tally.merged,
                missing: tally.missing,
                failures: tally.failures,
                bytes_written: tally.bytes_written,
                swept,
                started_at,
                finished_at: self.clock.now(),
            };
            debug!(phase = %MergePhase::Done, "merge phase");
            log_merge_report(&report);
            Ok(report)
        }
        .instrument(span)
        .await
    }

    async fn consume_chunks(
        &self,
        file_name: &FileName,
        total: TotalChunks,
        output: File,
    ) -> Result<WriteTally, StitchError> {
        let (tx, rx) = mpsc::channel(self.max_in_flight);
        let writer = tokio::spawn(write_in_order(output, rx).in_current_span());

        let permits = Arc::new(Semaphore::new(self.max_in_flight));
        let mut readers = JoinSet::new();
        for index in total.indices() {
            let permit = Arc::clone(&permits)
                .acquire_owned()
                .await
                .map_err(|e| StitchError::TaskJoin(e.to_string()))?;
            let path = self
                .layout
                .chunk_path(&ChunkKey::new(file_name.clone(), index));
            let tx = tx.clone();
            readers.spawn(
                async move {
                    let outcome = read_chunk(&path).await;
                    let read = ChunkRead {
                        index: index.get(),
                        path,
                        outcome,
                        _permit: permit,
                    };
                    // only fails if the writer is gone; it reports that itself
                    let _ = tx.send(read).await;
                }
                .in_current_span(),
            );
        }
        drop(tx);

        while let Some(joined) = readers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "chunk reader task failed");
            }
        }

        Ok(settle_writer(writer.await, total))
    }
}

/// A writer that died still lets the merge move on to the sweep; every index
/// is then reported as unaccounted for.
fn settle_writer(joined: Result<WriteTally, JoinError>, total: TotalChunks) -> WriteTally {
    match joined {
        Ok(tally) => tally,
        Err(e) => {
            warn!(error = %e, "chunk writer task failed");
            WriteTally {
                failures: total
                    .indices()
                    .map(|index| ChunkFailure {
                        index: index.get(),
                        stage: ChunkStage::Unreported,
                        reason: format!("writer task failed: {e}"),
                    })
                    .collect(),
                ..WriteTally::default()
            }
        }
    }
}

async fn read_chunk(path: &std::path::Path) -> ReadOutcome {
    match tokio::fs::read(path).await {
        Ok(bytes) => ReadOutcome::Bytes(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => ReadOutcome::Missing,
        Err(e) => ReadOutcome::Failed(e),
    }
}

/// Sole owner of the output handle. Writes strictly in ascending index order.
async fn write_in_order(mut output: File, mut rx: mpsc::Receiver<ChunkRead>) -> WriteTally {
    let mut tally = WriteTally::default();
    let mut pending: BTreeMap<u64, ChunkRead> = BTreeMap::new();
    let mut next = 0u64;

    while let Some(read) = rx.recv().await {
        pending.insert(read.index, read);
        while let Some(read) = pending.remove(&next) {
            apply(&mut output, read, &mut tally).await;
            next += 1;
        }
    }

    // Every sender is gone. Anything still pending sits behind an index whose
    // reader never reported; keep relative order and record the gaps.
    for (index, read) in std::mem::take(&mut pending) {
        for gap in next..index {
            warn!(chunk_index = gap, "chunk reader did not report");
            tally.failures.push(ChunkFailure {
                index: gap,
                stage: ChunkStage::Unreported,
                reason: "reader did not report".into(),
            });
        }
        apply(&mut output, read, &mut tally).await;
        next = index + 1;
    }

    tally
}

async fn apply(output: &mut File, read: ChunkRead, tally: &mut WriteTally) {
    let ChunkRead {
        index, path, outcome, ..
    } = read;

    let bytes = match outcome {
        ReadOutcome::Bytes(bytes) => bytes,
        ReadOutcome::Missing => {
            warn!(chunk_index = index, path = %path.display(), "chunk does not exist, skipping");
            tally.missing.push(index);
            return;
        }
        ReadOutcome::Failed(e) => {
            warn!(chunk_index = index, error = %e, "failed to read chunk, skipping");
            tally.failures.push(ChunkFailure {
                index,
                stage: ChunkStage::Read,
                reason: e.to_string(),
            });
            return;
        }
    };

    let written = async {
        output.write_all(&bytes).await?;
        output.flush().await
    }
    .await;
    if let Err(e) = written {
        warn!(chunk_index = index, error = %e, "failed to write chunk to output, skipping");
        tally.failures.push(ChunkFailure {
            index,
            stage: ChunkStage::Write,
            reason: e.to_string(),
        });
        return;
    }
    tally.merged.push(index);
    tally.bytes_written += bytes.len() as u64;
    debug!(chunk_index = index, bytes = bytes.len(), "chunk merged");

    if let Err(e) = tokio::fs::remove_file(&path).await {
        warn!(chunk_index = index, error = %e, "failed to remove merged chunk");
        tally.failures.push(ChunkFailure {
            index,
            stage: ChunkStage::Delete,
            reason: e.to_string(),
        });
    }
}
