pub mod hyper_server;
pub mod tcp;
pub mod tracking;
pub mod websocket;

pub use hyper_server::HyperBridgeAdapter;
pub use tcp::{TcpByteStream, TcpConnector};
pub use tracking::*;
pub use websocket::WebSocketChannel;
