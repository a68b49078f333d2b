use crate::domain::{Result, TargetAddress};
use crate::ports::ByteStream;
use async_trait::async_trait;

/// Port for establishing outbound stream connections
#[async_trait]
pub trait ConnectorPort: Send + Sync {
    /// Connect to the target address
    ///
    /// Returns a byte stream the relay takes ownership of
    async fn connect(&self, target: &TargetAddress) -> Result<Box<dyn ByteStream>>;
}
