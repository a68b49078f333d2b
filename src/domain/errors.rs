use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    MissingParameter(&'static str),
    MissingHeader(&'static str),
    UnsupportedProtocol(String),
    InvalidAddress(String),
    ConnectionFailed(String),
    ChannelClosed,
    ChannelFailed(String),
    StreamFailed(String),
    StreamAborted(String),
    Timeout,
    Config(String),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::MissingParameter(name) => write!(f, "Missing '{}' parameter", name),
            BridgeError::MissingHeader(header) => write!(f, "Missing '{}' header", header),
            BridgeError::UnsupportedProtocol(_) => write!(f, "Unsupported protocol"),
            BridgeError::InvalidAddress(msg) => write!(f, "Invalid address: {}", msg),
            BridgeError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            BridgeError::ChannelClosed => write!(f, "WebSocket is closed"),
            BridgeError::ChannelFailed(msg) => write!(f, "WebSocket error: {}", msg),
            BridgeError::StreamFailed(msg) => write!(f, "{}", msg),
            BridgeError::StreamAborted(reason) => write!(f, "TCP socket was aborted: {}", reason),
            BridgeError::Timeout => write!(f, "Operation timed out"),
            BridgeError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for BridgeError {}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::StreamFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
