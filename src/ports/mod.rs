pub mod channel;
pub mod connector;
pub mod stream;
pub mod tracking;

pub use channel::{ChannelEvents, ChannelSender, DuplexChannel};
pub use connector::ConnectorPort;
pub use stream::{ByteStream, StreamReader, StreamWriter};
pub use tracking::TrackingPort;
