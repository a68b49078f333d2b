pub mod errors;
pub mod models;
pub mod relay;
pub mod service;

pub use errors::*;
pub use models::*;
pub use relay::{DownstreamEnd, Relay, RelaySettings, TunnelReport, UpstreamEnd};
pub use service::{BridgeDecision, BridgeService};
