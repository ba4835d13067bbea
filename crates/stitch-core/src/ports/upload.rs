//! UploadPart port - transport から渡される file part

use tokio::io::AsyncRead;

/// Byte stream of one chunk as handed over by a transport.
pub type ChunkReader = dyn AsyncRead + Send + Unpin;

/// One uploaded file part.
///
/// The transport owns parsing; the core only needs the part's file name and
/// a way to open its bytes. Opening can fail (spooled temp file gone, etc.)
/// and that failure is reported separately from copy failures.
pub trait UploadPart: Send {
    fn file_name(&self) -> &str;

    fn open(self: Box<Self>) -> std::io::Result<Box<ChunkReader>>;
}
