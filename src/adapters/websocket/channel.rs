use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::borrow::Cow;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{watch, Mutex};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::WebSocketStream;
use tracing::debug;

use crate::domain::{BridgeError, ChannelEvent, CloseCode, Result};
use crate::ports::{ChannelEvents, ChannelSender, DuplexChannel};

/// Close reasons travel in a control frame, whose payload is capped at 125 bytes.
const MAX_CLOSE_REASON_LEN: usize = 123;

/// Server side of an accepted WebSocket, exposed as a `DuplexChannel`.
pub struct WebSocketChannel<S> {
    inner: WebSocketStream<S>,
}

impl<S> WebSocketChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(inner: WebSocketStream<S>) -> Self {
        Self { inner }
    }
}

impl<S> DuplexChannel for WebSocketChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn split(self: Box<Self>) -> (Box<dyn ChannelEvents>, Arc<dyn ChannelSender>) {
        let (sink, stream) = self.inner.split();
        let (closed, _) = watch::channel(false);
        let closed = Arc::new(closed);

        let events = WebSocketEvents {
            stream,
            closed: closed.clone(),
            done: false,
        };
        let sender = WebSocketSender {
            sink: Mutex::new(sink),
            closed,
        };
        (Box::new(events), Arc::new(sender))
    }
}

struct WebSocketEvents<S> {
    stream: SplitStream<WebSocketStream<S>>,
    closed: Arc<watch::Sender<bool>>,
    done: bool,
}

impl<S> WebSocketEvents<S> {
    fn finish(&mut self) {
        self.done = true;
        self.closed.send_replace(true);
    }
}

#[async_trait]
impl<S> ChannelEvents for WebSocketEvents<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn next_event(&mut self) -> ChannelEvent {
        while !self.done {
            match self.stream.next().await {
                Some(Ok(Message::Binary(payload))) => return ChannelEvent::Binary(payload),
                Some(Ok(Message::Text(text))) => return ChannelEvent::Text(text),
                Some(Ok(Message::Close(frame))) => {
                    debug!("WebSocket closed: {:?}", frame);
                    // tungstenite queues the close reply; polling once more flushes it.
                    let _ = self.stream.next().await;
                    self.finish();
                    return ChannelEvent::Closed;
                }
                // Pings are answered by tungstenite itself.
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => continue,
                Some(Err(WsError::ConnectionClosed)) | Some(Err(WsError::AlreadyClosed)) | None => {
                    self.finish();
                    return ChannelEvent::Closed;
                }
                Some(Err(e)) => {
                    self.finish();
                    return ChannelEvent::Error(e.to_string());
                }
            }
        }
        ChannelEvent::Closed
    }
}

struct WebSocketSender<S> {
    sink: Mutex<SplitSink<WebSocketStream<S>, Message>>,
    closed: Arc<watch::Sender<bool>>,
}

#[async_trait]
impl<S> ChannelSender for WebSocketSender<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send_binary(&self, payload: Vec<u8>) -> Result<()> {
        if self.is_closed() {
            return Err(BridgeError::ChannelClosed);
        }
        let mut sink = self.sink.lock().await;
        sink.send(Message::Binary(payload))
            .await
            .map_err(|e| BridgeError::ChannelFailed(e.to_string()))
    }

    async fn close(&self, code: CloseCode, reason: &str) {
        if self.closed.send_replace(true) {
            return;
        }
        let frame = CloseFrame {
            code: WsCloseCode::from(code.0),
            reason: Cow::Owned(truncate_reason(reason).to_string()),
        };
        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.send(Message::Close(Some(frame))).await {
            debug!("failed to send close frame ({}): {}", code, e);
        }
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

fn truncate_reason(reason: &str) -> &str {
    if reason.len() <= MAX_CLOSE_REASON_LEN {
        return reason;
    }
    let mut end = MAX_CLOSE_REASON_LEN;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    &reason[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, DuplexStream};
    use tokio_tungstenite::tungstenite::protocol::Role;

    async fn pair() -> (Box<dyn DuplexChannel>, WebSocketStream<DuplexStream>) {
        let (server_io, client_io) = duplex(64 * 1024);
        let server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
        let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;
        (Box::new(WebSocketChannel::new(server)), client)
    }

    #[test]
    fn test_truncate_reason_respects_char_boundaries() {
        assert_eq!(truncate_reason("short"), "short");
        let long = "é".repeat(100);
        let truncated = truncate_reason(&long);
        assert!(truncated.len() <= MAX_CLOSE_REASON_LEN);
        assert_eq!(truncated.len() % 2, 0);
    }

    #[tokio::test]
    async fn test_events_map_message_types() {
        let (channel, mut client) = pair().await;
        let (mut events, _sender) = channel.split();

        client.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
        client.send(Message::Ping(vec![9])).await.unwrap();
        client.send(Message::Text("hi".to_string())).await.unwrap();
        client.close(None).await.unwrap();

        assert_eq!(events.next_event().await, ChannelEvent::Binary(vec![1, 2, 3]));
        assert_eq!(events.next_event().await, ChannelEvent::Text("hi".to_string()));
        assert_eq!(events.next_event().await, ChannelEvent::Closed);
        assert_eq!(events.next_event().await, ChannelEvent::Closed);
    }

    #[tokio::test]
    async fn test_close_sends_code_and_rejects_further_sends() {
        let (channel, mut client) = pair().await;
        let (_events, sender) = channel.split();

        sender.send_binary(b"data".to_vec()).await.unwrap();
        sender.close(CloseCode::UNSUPPORTED_DATA, "Received text frame").await;
        sender.close(CloseCode::NORMAL, "ignored").await;
        assert!(sender.is_closed());
        assert_eq!(sender.send_binary(b"late".to_vec()).await, Err(BridgeError::ChannelClosed));

        assert_eq!(client.next().await.unwrap().unwrap(), Message::Binary(b"data".to_vec()));
        match client.next().await.unwrap().unwrap() {
            Message::Close(Some(frame)) => {
                assert_eq!(u16::from(frame.code), 1003);
                assert_eq!(frame.reason, "Received text frame");
            }
            other => panic!("expected close frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_peer_close_marks_sender_closed() {
        let (channel, mut client) = pair().await;
        let (mut events, sender) = channel.split();

        client.close(None).await.unwrap();
        assert_eq!(events.next_event().await, ChannelEvent::Closed);

        tokio::time::timeout(std::time::Duration::from_secs(1), sender.closed())
            .await
            .expect("sender should observe the peer close");
        assert!(sender.is_closed());
    }
}
