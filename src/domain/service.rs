use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{BridgeError, BridgeRequest, BridgeResponse, Result, StatusCode, TargetAddress, TransportProtocol, TunnelInfo};
use crate::ports::{ByteStream, ConnectorPort, TrackingPort};

pub const DEFAULT_BRIDGE_PATH: &str = "/v1/bridge/ws";

pub enum BridgeDecision {
    Rejected(BridgeResponse),
    Accepted {
        info: TunnelInfo,
        websocket_key: String,
        stream: Box<dyn ByteStream>,
    },
}

struct ValidatedRequest {
    protocol: TransportProtocol,
    target: TargetAddress,
    websocket_key: String,
}

#[derive(Clone)]
pub struct BridgeService {
    path: String,
    connector: Arc<dyn ConnectorPort>,
    tracker: Arc<dyn TrackingPort>,
}

impl BridgeService {
    pub fn new(connector: Arc<dyn ConnectorPort>, tracker: Arc<dyn TrackingPort>) -> Self {
        Self {
            path: DEFAULT_BRIDGE_PATH.to_string(),
            connector,
            tracker,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Validate an upgrade request and, if it is acceptable, open the outbound stream.
    pub async fn handle_upgrade_request(&self, request: &BridgeRequest) -> BridgeDecision {
        if request.path != self.path {
            return BridgeDecision::Rejected(BridgeResponse::new(StatusCode::NOT_FOUND));
        }
        if request.method != "GET" {
            return BridgeDecision::Rejected(BridgeResponse::new(StatusCode::METHOD_NOT_ALLOWED));
        }

        let validated = match validate(request) {
            Ok(validated) => validated,
            Err(e) => {
                warn!("rejecting bridge request: {}", e);
                return BridgeDecision::Rejected(BridgeResponse::from(&e));
            }
        };

        let stream = match self.connector.connect(&validated.target).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("failed to connect to {}: {}", validated.target, e);
                return BridgeDecision::Rejected(BridgeResponse::from(&e));
            }
        };

        let info = TunnelInfo::new(validated.protocol, &validated.target);
        if let Err(e) = self.tracker.track_tunnel(info.clone()).await {
            warn!("failed to track tunnel {}: {}", info.id, e);
        }

        BridgeDecision::Accepted {
            info,
            websocket_key: validated.websocket_key,
            stream,
        }
    }

    pub async fn close_tunnel(&self, id: Uuid) -> Result<()> {
        info!("tunnel {} closed", id);
        self.tracker.close_tunnel(id).await
    }
}

fn validate(request: &BridgeRequest) -> Result<ValidatedRequest> {
    let protocol = request
        .param("protocol")
        .ok_or(BridgeError::MissingParameter("protocol"))?;
    let address = request
        .param("address")
        .ok_or(BridgeError::MissingParameter("address"))?;

    let connection_upgrade = request
        .header("connection")
        .map(|value| value.split(',').any(|token| token.trim().eq_ignore_ascii_case("upgrade")))
        .unwrap_or(false);
    if !connection_upgrade {
        return Err(BridgeError::MissingHeader("Connection: Upgrade"));
    }

    let upgrade_websocket = request
        .header("upgrade")
        .map(|value| value.trim().eq_ignore_ascii_case("websocket"))
        .unwrap_or(false);
    if !upgrade_websocket {
        return Err(BridgeError::MissingHeader("Upgrade: websocket"));
    }

    let websocket_key = request
        .header("sec-websocket-key")
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or(BridgeError::MissingHeader("Sec-WebSocket-Key"))?
        .to_string();

    let protocol =
        TransportProtocol::from_param(protocol).ok_or_else(|| BridgeError::UnsupportedProtocol(protocol.to_string()))?;
    let target = TargetAddress::parse(address)?;

    Ok(ValidatedRequest {
        protocol,
        target,
        websocket_key,
    })
}
