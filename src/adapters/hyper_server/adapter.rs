use http_body_util::{combinators::BoxBody, BodyExt, Empty, Full};
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONNECTION, CONTENT_TYPE, SEC_WEBSOCKET_ACCEPT, UPGRADE};
use hyper::{body::Incoming, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;
use tokio_tungstenite::tungstenite::protocol::Role;
use tokio_tungstenite::WebSocketStream;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::adapters::websocket::WebSocketChannel;
use crate::domain::{BridgeDecision, BridgeRequest, BridgeResponse, BridgeService, Relay};
use crate::ports::ByteStream;

pub type Body = BoxBody<Bytes, hyper::Error>;

pub struct HyperBridgeAdapter {
    service: Arc<BridgeService>,
    relay: Relay,
}

impl HyperBridgeAdapter {
    pub fn new(service: Arc<BridgeService>, relay: Relay) -> Self {
        Self { service, relay }
    }

    pub async fn handle(&self, req: Request<Incoming>) -> Response<Body> {
        self.handle_internal(req).await.unwrap_or_else(|e| {
            error!("Bridge error: {}", e);
            let mut response = Response::new(empty());
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        })
    }

    async fn handle_internal(&self, req: Request<Incoming>) -> Result<Response<Body>, Box<dyn std::error::Error>> {
        let bridge_req = convert_to_domain_request(&req);

        match self.service.handle_upgrade_request(&bridge_req).await {
            BridgeDecision::Rejected(response) => convert_response(response),
            BridgeDecision::Accepted {
                info,
                websocket_key,
                stream,
            } => {
                let accept = derive_accept_key(websocket_key.as_bytes());
                establish_tunnel(req, stream, info.id, self.service.clone(), self.relay.clone());

                Ok(Response::builder()
                    .status(StatusCode::SWITCHING_PROTOCOLS)
                    .header(CONNECTION, HeaderValue::from_static("Upgrade"))
                    .header(UPGRADE, HeaderValue::from_static("websocket"))
                    .header(SEC_WEBSOCKET_ACCEPT, accept)
                    .body(empty())?)
            }
        }
    }
}

fn convert_to_domain_request(req: &Request<Incoming>) -> BridgeRequest {
    BridgeRequest::new(req.method().as_str(), req.uri().path())
        .with_query_string(req.uri().query())
        .with_headers(extract_headers(req))
}

fn extract_headers(req: &Request<Incoming>) -> HashMap<String, String> {
    req.headers()
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|val| (k.to_string(), val.to_string())))
        .collect()
}

fn convert_response(response: BridgeResponse) -> Result<Response<Body>, Box<dyn std::error::Error>> {
    let builder = Response::builder().status(response.status);

    let response = match response.body {
        Some(text) => builder
            .header(CONTENT_TYPE, HeaderValue::from_static("text/plain;charset=UTF-8"))
            .body(full(text))?,
        None => builder.body(empty())?,
    };
    Ok(response)
}

fn empty() -> Body {
    Empty::<Bytes>::new().map_err(|never| match never {}).boxed()
}

fn full(text: String) -> Body {
    Full::new(Bytes::from(text)).map_err(|never| match never {}).boxed()
}

/// Runs the relay once hyper hands over the upgraded connection.
fn establish_tunnel(
    req: Request<Incoming>,
    stream: Box<dyn ByteStream>,
    tunnel_id: Uuid,
    service: Arc<BridgeService>,
    relay: Relay,
) {
    let span = info_span!("tunnel", id = %tunnel_id);

    tokio::spawn(
        async move {
            match hyper::upgrade::on(req).await {
                Ok(upgraded) => {
                    let socket = WebSocketStream::from_raw_socket(TokioIo::new(upgraded), Role::Server, None).await;
                    let report = relay.run(Box::new(WebSocketChannel::new(socket)), stream).await;
                    info!(
                        "relay finished: up={} down={} ({:?} / {:?})",
                        report.bytes_upstream, report.bytes_downstream, report.upstream, report.downstream
                    );
                }
                Err(e) => error!("Failed to upgrade to WebSocket: {}", e),
            }
            service.close_tunnel(tunnel_id).await.ok();
        }
        .instrument(span),
    );
}
