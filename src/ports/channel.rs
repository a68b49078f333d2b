use crate::domain::{ChannelEvent, CloseCode, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Receiving half of a message channel.
#[async_trait]
pub trait ChannelEvents: Send {
    /// Wait for the next event. Once `Closed` or `Error` has been returned,
    /// every later call returns `Closed`.
    async fn next_event(&mut self) -> ChannelEvent;
}

/// Sending half of a message channel. Shared by both pumps of a tunnel.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// Send one binary message. Fails with `ChannelClosed` once the channel is closed.
    async fn send_binary(&self, payload: Vec<u8>) -> Result<()>;

    /// Close the channel. Only the first call has an effect.
    async fn close(&self, code: CloseCode, reason: &str);

    /// Whether the channel has been closed by either side.
    fn is_closed(&self) -> bool;

    /// Resolves once the channel has been closed by either side.
    async fn closed(&self);
}

/// An accepted, already-open message channel.
pub trait DuplexChannel: Send {
    fn split(self: Box<Self>) -> (Box<dyn ChannelEvents>, Arc<dyn ChannelSender>);
}
