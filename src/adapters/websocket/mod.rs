mod channel;

pub use channel::WebSocketChannel;
