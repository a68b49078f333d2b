pub use hyper::StatusCode;
use std::collections::HashMap;
use std::fmt;

use super::{BridgeError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeResponse {
    pub status: StatusCode,
    pub body: Option<String>,
}

impl BridgeResponse {
    pub fn new(status: StatusCode) -> Self {
        Self { status, body: None }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

impl From<&BridgeError> for BridgeResponse {
    fn from(err: &BridgeError) -> Self {
        match err {
            BridgeError::MissingParameter(_)
            | BridgeError::MissingHeader(_)
            | BridgeError::UnsupportedProtocol(_)
            | BridgeError::InvalidAddress(_) => BridgeResponse::new(StatusCode::BAD_REQUEST).with_body(err.to_string()),
            // Establishment failures surface as a bad address, like a malformed one.
            BridgeError::ConnectionFailed(msg) => BridgeResponse::new(StatusCode::BAD_REQUEST)
                .with_body(BridgeError::InvalidAddress(msg.clone()).to_string()),
            BridgeError::Timeout => BridgeResponse::new(StatusCode::BAD_REQUEST)
                .with_body(BridgeError::InvalidAddress(err.to_string()).to_string()),
            _ => BridgeResponse::new(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

/// Transport protocols a tunnel can be opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportProtocol {
    Tcp,
}

impl TransportProtocol {
    pub fn as_str(&self) -> &str {
        match self {
            TransportProtocol::Tcp => "tcp",
        }
    }

    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "tcp" => Some(TransportProtocol::Tcp),
            _ => None,
        }
    }
}

impl fmt::Display for TransportProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination of the outbound stream, as given in the `address` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetAddress {
    pub host: String,
    pub port: u16,
}

impl TargetAddress {
    /// Parses `host:port`, where an IPv6 host must be bracketed (`[::1]:22`).
    pub fn parse(address: &str) -> Result<Self> {
        let (host, port) = address
            .rsplit_once(':')
            .ok_or_else(|| BridgeError::InvalidAddress(format!("missing port in '{}'", address)))?;

        let host = if let Some(inner) = host.strip_prefix('[') {
            inner
                .strip_suffix(']')
                .ok_or_else(|| BridgeError::InvalidAddress(format!("unterminated IPv6 host in '{}'", address)))?
        } else if host.contains(':') {
            return Err(BridgeError::InvalidAddress(format!(
                "IPv6 host must be enclosed in brackets in '{}'",
                address
            )));
        } else {
            host
        };

        if host.is_empty() {
            return Err(BridgeError::InvalidAddress(format!("missing host in '{}'", address)));
        }

        let port: u16 = port
            .parse()
            .map_err(|e| BridgeError::InvalidAddress(format!("invalid port '{}': {}", port, e)))?;
        if port == 0 {
            return Err(BridgeError::InvalidAddress("port must not be 0".to_string()));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for TargetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Transport-agnostic view of an inbound upgrade request.
#[derive(Debug, Clone)]
pub struct BridgeRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    /// Header names are stored lowercased.
    pub headers: HashMap<String, String>,
}

impl BridgeRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            query: HashMap::new(),
            headers: HashMap::new(),
        }
    }

    /// Decodes a raw query string. The first occurrence of a key wins.
    pub fn with_query_string(mut self, query: Option<&str>) -> Self {
        if let Some(query) = query {
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                self.query.entry(key.into_owned()).or_insert_with(|| value.into_owned());
            }
        }
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        for (name, value) in headers {
            self.headers.insert(name.to_lowercase(), value);
        }
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }
}

/// WebSocket close status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseCode(pub u16);

impl CloseCode {
    pub const NORMAL: CloseCode = CloseCode(1000);
    pub const PROTOCOL_ERROR: CloseCode = CloseCode(1002);
    pub const UNSUPPORTED_DATA: CloseCode = CloseCode(1003);
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the upstream pump receives from the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Binary(Vec<u8>),
    Text(String),
    Closed,
    Error(String),
}

#[derive(Debug, Clone)]
pub struct TunnelInfo {
    pub id: uuid::Uuid,
    pub protocol: TransportProtocol,
    pub target: String,
    pub opened_at: std::time::Instant,
    pub closed_at: Option<std::time::Instant>,
}

impl TunnelInfo {
    pub fn new(protocol: TransportProtocol, target: &TargetAddress) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            protocol,
            target: target.to_string(),
            opened_at: std::time::Instant::now(),
            closed_at: None,
        }
    }

    pub fn close(&mut self) {
        self.closed_at = Some(std::time::Instant::now());
    }
}
