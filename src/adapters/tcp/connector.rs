use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::TcpByteStream;
use crate::domain::{BridgeError, Result, TargetAddress};
use crate::ports::{ByteStream, ConnectorPort};

#[derive(Clone)]
pub struct TcpConnector {
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl ConnectorPort for TcpConnector {
    async fn connect(&self, target: &TargetAddress) -> Result<Box<dyn ByteStream>> {
        let addr = target.to_string();

        match timeout(self.connect_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    log::debug!("Failed to set TCP_NODELAY on {}: {}", addr, e);
                }
                log::debug!("Connected to {}", addr);
                Ok(Box::new(TcpByteStream::new(stream)))
            }
            Ok(Err(e)) => {
                log::debug!("Failed to connect to {}: {}", addr, e);
                Err(BridgeError::ConnectionFailed(e.to_string()))
            }
            Err(_) => {
                log::debug!("Timeout connecting to {}", addr);
                Err(BridgeError::Timeout)
            }
        }
    }
}
