//! UploadPart の実装 - メモリ上のバイト列とローカルファイル

use std::io::Cursor;
use std::path::PathBuf;

use crate::ports::{ChunkReader, UploadPart};

/// A part whose bytes are already in memory.
#[derive(Debug, Clone)]
pub struct BytesPart {
    file_name: String,
    bytes: Vec<u8>,
}

impl BytesPart {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

impl UploadPart for BytesPart {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn open(self: Box<Self>) -> std::io::Result<Box<ChunkReader>> {
        Ok(Box::new(Cursor::new(self.bytes)))
    }
}

/// A part spooled to a local file, opened lazily.
#[derive(Debug, Clone)]
pub struct PathPart {
    file_name: String,
    path: PathBuf,
}

impl PathPart {
    pub fn new(file_name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            file_name: file_name.into(),
            path: path.into(),
        }
    }
}

impl UploadPart for PathPart {
    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn open(self: Box<Self>) -> std::io::Result<Box<ChunkReader>> {
        let file = std::fs::File::open(&self.path)?;
        Ok(Box::new(tokio::fs::File::from_std(file)))
    }
}
