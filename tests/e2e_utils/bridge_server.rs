#![cfg(test)]
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use wsbridge::adapters::hyper_server::serve;
use wsbridge::adapters::{ConnectionTracker, HyperBridgeAdapter, TcpConnector};
use wsbridge::domain::{BridgeService, Relay, RelaySettings};
use wsbridge::ports::TrackingPort;

pub const BRIDGE_PATH: &str = "/v1/bridge/ws";

pub struct TestBridgeServer {
    addr: SocketAddr,
    tracker: Arc<ConnectionTracker>,
    _server_handle: JoinHandle<()>,
}

impl TestBridgeServer {
    pub async fn start() -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let tracker = Arc::new(ConnectionTracker::new());
        let tracker_port: Arc<dyn TrackingPort> = tracker.clone();

        let connector = Arc::new(TcpConnector::new(Duration::from_secs(2)));
        let service = Arc::new(BridgeService::new(connector, tracker_port));
        let relay = Relay::new(RelaySettings {
            read_buffer_size: 4096,
            close_timeout: Duration::from_millis(500),
        });
        let adapter = Arc::new(HyperBridgeAdapter::new(service, relay));

        let server_handle = tokio::spawn(serve(listener, adapter));

        Ok(Self {
            addr,
            tracker,
            _server_handle: server_handle,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn tunnel_url(&self, protocol: &str, address: &str) -> String {
        format!("ws://{}{}?protocol={}&address={}", self.addr, BRIDGE_PATH, protocol, address)
    }

    pub async fn active_tunnels(&self) -> usize {
        self.tracker.get_active_tunnels().await.map(|t| t.len()).unwrap_or(0)
    }
}
