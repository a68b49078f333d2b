use crate::domain::{Result, TunnelInfo};
use crate::ports::TrackingPort;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::time::interval;
use tracing::info;
use uuid::Uuid;

/// How long closed tunnels stay listed before being pruned.
const CLOSED_RETENTION: Duration = Duration::from_secs(4);

/// Tunnel tracker implementation
pub struct ConnectionTracker {
    tunnels: Arc<RwLock<Vec<TunnelInfo>>>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self {
            tunnels: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Start background cleanup task
    pub fn start_cleanup(&self) -> tokio::task::JoinHandle<()> {
        let tunnels = self.tunnels.clone();

        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_millis(250));

            loop {
                ticker.tick().await;
                prune_closed(&mut *tunnels.write().await, Instant::now());
            }
        })
    }
}

fn prune_closed(tunnels: &mut Vec<TunnelInfo>, now: Instant) {
    tunnels.retain(|tunnel| match tunnel.closed_at {
        Some(closed_at) => now.duration_since(closed_at) < CLOSED_RETENTION,
        None => true,
    });
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrackingPort for ConnectionTracker {
    async fn track_tunnel(&self, info: TunnelInfo) -> Result<()> {
        info!("tunnel {} opened: {} {}", info.id, info.protocol, info.target);

        let mut tunnels = self.tunnels.write().await;
        tunnels.push(info);

        Ok(())
    }

    async fn close_tunnel(&self, id: Uuid) -> Result<()> {
        let mut tunnels = self.tunnels.write().await;

        if let Some(tunnel) = tunnels.iter_mut().find(|t| t.id == id) {
            tunnel.close();
        }

        Ok(())
    }

    async fn get_active_tunnels(&self) -> Result<Vec<TunnelInfo>> {
        let tunnels = self.tunnels.read().await;
        Ok(tunnels.iter().filter(|t| t.closed_at.is_none()).cloned().collect())
    }
}
