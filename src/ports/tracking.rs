use crate::domain::{Result, TunnelInfo};
use async_trait::async_trait;
use uuid::Uuid;

/// Port for tracking active tunnels
#[async_trait]
pub trait TrackingPort: Send + Sync {
    /// Register a new tunnel
    async fn track_tunnel(&self, info: TunnelInfo) -> Result<()>;

    /// Mark a tunnel as closed
    async fn close_tunnel(&self, id: Uuid) -> Result<()>;

    /// Get all active tunnels
    async fn get_active_tunnels(&self) -> Result<Vec<TunnelInfo>>;
}
