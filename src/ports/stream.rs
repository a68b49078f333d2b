use crate::domain::Result;
use async_trait::async_trait;

/// Readable side of a byte stream.
#[async_trait]
pub trait StreamReader: Send {
    /// Read the next chunk into `buf`. `Ok(0)` means end-of-stream.
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Writable side of a byte stream.
#[async_trait]
pub trait StreamWriter: Send {
    /// Write the whole payload, in order.
    async fn write_all(&mut self, payload: &[u8]) -> Result<()>;

    /// Graceful half-close: no more data will be written.
    async fn close(&mut self) -> Result<()>;

    /// Abnormal termination of the writable side.
    async fn abort(&mut self, reason: &str);
}

/// An established, already-open byte stream to the remote endpoint.
pub trait ByteStream: Send {
    fn split(self: Box<Self>) -> (Box<dyn StreamReader>, Box<dyn StreamWriter>);
}
