#![cfg(test)]
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod bridge_server;
pub mod http;
pub mod tcp_target;

pub use bridge_server::TestBridgeServer;
pub use http::{raw_request, RawResponse};
pub use tcp_target::{EchoTarget, ScriptedTarget};
