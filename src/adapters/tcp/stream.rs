use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

use crate::domain::{BridgeError, Result};
use crate::ports::{ByteStream, StreamReader, StreamWriter};

/// Outbound TCP connection owned by a tunnel.
pub struct TcpByteStream {
    inner: TcpStream,
}

impl TcpByteStream {
    pub fn new(inner: TcpStream) -> Self {
        Self { inner }
    }
}

impl ByteStream for TcpByteStream {
    fn split(self: Box<Self>) -> (Box<dyn StreamReader>, Box<dyn StreamWriter>) {
        let (read, write) = self.inner.into_split();
        let writer = TcpWriter {
            inner: Some(write),
            aborted: None,
        };
        (Box::new(TcpReader { inner: read }), Box::new(writer))
    }
}

struct TcpReader {
    inner: OwnedReadHalf,
}

#[async_trait]
impl StreamReader for TcpReader {
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.inner.read(buf).await?)
    }
}

struct TcpWriter {
    inner: Option<OwnedWriteHalf>,
    aborted: Option<String>,
}

impl TcpWriter {
    fn half(&mut self) -> Result<&mut OwnedWriteHalf> {
        match (&mut self.inner, &self.aborted) {
            (Some(half), _) => Ok(half),
            (None, Some(reason)) => Err(BridgeError::StreamAborted(reason.clone())),
            (None, None) => Err(BridgeError::StreamFailed("TCP socket was closed for writing".to_string())),
        }
    }
}

#[async_trait]
impl StreamWriter for TcpWriter {
    async fn write_all(&mut self, payload: &[u8]) -> Result<()> {
        let half = self.half()?;
        half.write_all(payload).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        match self.inner.take() {
            Some(mut half) => {
                half.shutdown().await?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    async fn abort(&mut self, reason: &str) {
        if let Some(half) = self.inner.take() {
            debug!("aborting TCP socket: {}", reason);
            // A zero linger makes the final close reset the connection instead of finishing it.
            #[allow(deprecated)]
            let linger = half.as_ref().set_linger(Some(Duration::ZERO));
            if let Err(e) = linger {
                debug!("failed to set SO_LINGER: {}", e);
            }
            // Skip the FIN that dropping the write half would send.
            half.forget();
            self.aborted = Some(reason.to_string());
        }
    }
}
