mod adapter;
mod server;

pub use adapter::{Body, HyperBridgeAdapter};
pub use server::serve;
