//! Result sink implementations

mod channel;

pub use channel::ChannelResultSink;
