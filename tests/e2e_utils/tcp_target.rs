#![cfg(test)]
#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Echoes every byte back until the client half-closes, then closes too.
pub struct EchoTarget {
    addr: SocketAddr,
    _handle: JoinHandle<()>,
}

impl EchoTarget {
    pub async fn start() -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let (mut read, mut write) = socket.split();
                    let _ = tokio::io::copy(&mut read, &mut write).await;
                    let _ = write.shutdown().await;
                });
            }
        });

        Ok(Self { addr, _handle: handle })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

/// What a scripted target saw on one connection.
#[derive(Debug)]
pub struct Observed {
    pub received: Vec<u8>,
    /// True when the client side ended with a FIN rather than a reset.
    pub clean_eof: bool,
}

/// Sends a greeting, optionally half-closes, then records everything it receives.
pub struct ScriptedTarget {
    addr: SocketAddr,
    observed: mpsc::UnboundedReceiver<Observed>,
    _handle: JoinHandle<()>,
}

impl ScriptedTarget {
    pub async fn start(greeting: &'static [u8], close_after_greeting: bool) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (tx, rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let observed = Self::handle_connection(socket, greeting, close_after_greeting).await;
                    let _ = tx.send(observed);
                });
            }
        });

        Ok(Self {
            addr,
            observed: rx,
            _handle: handle,
        })
    }

    async fn handle_connection(mut socket: TcpStream, greeting: &[u8], close_after_greeting: bool) -> Observed {
        if !greeting.is_empty() {
            let _ = socket.write_all(greeting).await;
        }
        if close_after_greeting {
            let _ = socket.shutdown().await;
        }

        let mut received = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            match socket.read(&mut chunk).await {
                Ok(0) => {
                    return Observed {
                        received,
                        clean_eof: true,
                    }
                }
                Ok(n) => received.extend_from_slice(&chunk[..n]),
                Err(_) => {
                    return Observed {
                        received,
                        clean_eof: false,
                    }
                }
            }
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn next_observed(&mut self) -> Observed {
        tokio::time::timeout(Duration::from_secs(5), self.observed.recv())
            .await
            .expect("target should finish within timeout")
            .expect("target task should report")
    }
}
