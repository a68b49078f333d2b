//! Bidirectional relay between a message channel and a byte stream.
//!
//! Two pumps run concurrently for the lifetime of a tunnel. They share nothing
//! but the channel sender, whose closed state is how each pump learns that the
//! other side has terminated.

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{ChannelEvent, CloseCode};
use crate::ports::{ByteStream, ChannelEvents, ChannelSender, DuplexChannel, StreamReader, StreamWriter};

const TEXT_FRAME_REASON: &str = "Received text frame";
const TEXT_FRAME_ABORT_REASON: &str = "Received text frame from WebSocket client";
const STREAM_ENDED_REASON: &str = "TCP socket was closed";

#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub read_buffer_size: usize,
    /// How long to wait for the peer to echo a locally initiated close.
    pub close_timeout: Duration,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            read_buffer_size: 16 * 1024,
            close_timeout: Duration::from_secs(5),
        }
    }
}

/// Terminal event of the channel→stream direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamEnd {
    ChannelClosed,
    CloseTimedOut,
    ChannelError(String),
    TextFrame,
    WriteFailed(String),
}

/// Terminal event of the stream→channel direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownstreamEnd {
    StreamEnded,
    ReadFailed(String),
    ChannelClosed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelReport {
    pub bytes_upstream: u64,
    pub bytes_downstream: u64,
    pub upstream: UpstreamEnd,
    pub downstream: DownstreamEnd,
}

#[derive(Debug, Clone, Default)]
pub struct Relay {
    settings: RelaySettings,
}

impl Relay {
    pub fn new(settings: RelaySettings) -> Self {
        Self { settings }
    }

    /// Pump bytes both ways until both directions have terminated.
    ///
    /// Both endpoints are dropped when this returns.
    pub async fn run(&self, channel: Box<dyn DuplexChannel>, stream: Box<dyn ByteStream>) -> TunnelReport {
        let (events, sender) = channel.split();
        let (reader, writer) = stream.split();

        let upstream = pump_upstream(events, writer, sender.clone(), self.settings.close_timeout);
        let downstream = pump_downstream(reader, sender, self.settings.read_buffer_size);

        let ((bytes_upstream, upstream), (bytes_downstream, downstream)) = tokio::join!(upstream, downstream);

        TunnelReport {
            bytes_upstream,
            bytes_downstream,
            upstream,
            downstream,
        }
    }
}

async fn pump_upstream(
    mut events: Box<dyn ChannelEvents>,
    mut writer: Box<dyn StreamWriter>,
    sender: Arc<dyn ChannelSender>,
    close_timeout: Duration,
) -> (u64, UpstreamEnd) {
    let mut forwarded = 0u64;

    let close_echo = close_echo_deadline(sender.as_ref(), close_timeout);
    tokio::pin!(close_echo);

    loop {
        let event = tokio::select! {
            biased;
            event = events.next_event() => event,
            _ = &mut close_echo => {
                debug!("peer did not acknowledge close within {:?}", close_timeout);
                if let Err(e) = writer.close().await {
                    debug!("half-close of TCP socket failed: {}", e);
                }
                return (forwarded, UpstreamEnd::CloseTimedOut);
            }
        };

        match event {
            ChannelEvent::Binary(payload) => match writer.write_all(&payload).await {
                Ok(()) => forwarded += payload.len() as u64,
                Err(e) => {
                    let reason = format!("Failed to write data to TCP socket: {}", e);
                    debug!("{}", reason);
                    sender.close(CloseCode::PROTOCOL_ERROR, &reason).await;
                    return (forwarded, UpstreamEnd::WriteFailed(e.to_string()));
                }
            },
            ChannelEvent::Text(_) => {
                debug!("text frame on a binary-only tunnel");
                sender.close(CloseCode::UNSUPPORTED_DATA, TEXT_FRAME_REASON).await;
                writer.abort(TEXT_FRAME_ABORT_REASON).await;
                return (forwarded, UpstreamEnd::TextFrame);
            }
            ChannelEvent::Closed => {
                if let Err(e) = writer.close().await {
                    debug!("half-close of TCP socket failed: {}", e);
                }
                return (forwarded, UpstreamEnd::ChannelClosed);
            }
            ChannelEvent::Error(message) => {
                debug!("channel error: {}", message);
                writer.abort(&message).await;
                return (forwarded, UpstreamEnd::ChannelError(message));
            }
        }
    }
}

async fn close_echo_deadline(sender: &dyn ChannelSender, close_timeout: Duration) {
    sender.closed().await;
    tokio::time::sleep(close_timeout).await;
}

async fn pump_downstream(
    mut reader: Box<dyn StreamReader>,
    sender: Arc<dyn ChannelSender>,
    read_buffer_size: usize,
) -> (u64, DownstreamEnd) {
    let mut forwarded = 0u64;
    let mut buf = vec![0u8; read_buffer_size.max(1)];

    loop {
        let read = tokio::select! {
            biased;
            _ = sender.closed() => return (forwarded, DownstreamEnd::ChannelClosed),
            read = reader.read_chunk(&mut buf) => read,
        };

        match read {
            Ok(0) => {
                sender.close(CloseCode::NORMAL, STREAM_ENDED_REASON).await;
                return (forwarded, DownstreamEnd::StreamEnded);
            }
            Ok(n) => {
                if let Err(e) = sender.send_binary(buf[..n].to_vec()).await {
                    debug!("dropping {} bytes from TCP socket: {}", n, e);
                    return (forwarded, DownstreamEnd::ChannelClosed);
                }
                forwarded += n as u64;
            }
            Err(e) => {
                let reason = format!("Failed to read data from TCP socket: {}", e);
                debug!("{}", reason);
                sender.close(CloseCode::PROTOCOL_ERROR, &reason).await;
                return (forwarded, DownstreamEnd::ReadFailed(e.to_string()));
            }
        }
    }
}
