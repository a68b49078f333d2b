mod connector;
mod stream;

pub use connector::TcpConnector;
pub use stream::TcpByteStream;
