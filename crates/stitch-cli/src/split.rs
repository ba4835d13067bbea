//! ローカルファイルを固定長の範囲に分け、それぞれを UploadPart として渡す。
//!
//! 範囲ごとにファイルを開き直して seek するので、分割してもメモリに載せない。

use std::io::{self, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use stitch_core::ports::{ChunkReader, UploadPart};
use tokio::io::AsyncReadExt;

/// `[offset, offset + len)` of a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangePart {
    file_name: String,
    path: PathBuf,
    pub index: u64,
    pub offset: u64,
    pub len: u64,
}

impl UploadPart for RangePart {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn open(self: Box<Self>) -> io::Result<Box<ChunkReader>> {
        let mut file = std::fs::File::open(&self.path)?;
        file.seek(SeekFrom::Start(self.offset))?;
        Ok(Box::new(tokio::fs::File::from_std(file).take(self.len)))
    }
}

/// Byte ranges of a `len`-byte file cut every `chunk_size` bytes.
/// An empty file still yields one empty range.
pub fn chunk_ranges(len: u64, chunk_size: u64) -> Vec<(u64, u64)> {
    let chunk_size = chunk_size.max(1);
    if len == 0 {
        return vec![(0, 0)];
    }
    (0..len)
        .step_by(chunk_size as usize)
        .map(|offset| (offset, chunk_size.min(len - offset)))
        .collect()
}

pub fn split_into_chunks(
    path: &Path,
    file_name: &str,
    chunk_size: u64,
) -> io::Result<Vec<RangePart>> {
    let len = std::fs::metadata(path)?.len();
    Ok(chunk_ranges(len, chunk_size)
        .into_iter()
        .zip(0u64..)
        .map(|((offset, len), index)| RangePart {
            file_name: file_name.to_owned(),
            path: path.to_path_buf(),
            index,
            offset,
            len,
        })
        .collect())
}
