//! GTFS-realtime decoding.
//!
//! [`bindings`] holds the protobuf message types. A [`FeedCodec`] is the
//! [`FeedParser`] for one set of enabled [`Extension`]s, and [`CodecCache`]
//! memoizes codecs per extension set.

pub mod bindings;
mod cache;
mod codec;
mod extensions;

pub use bindings::FeedMessage;
pub use cache::CodecCache;
pub use codec::{FeedCodec, FeedParser, ParseError};
pub use extensions::{Extension, ExtensionSet};

/// Embedded header timestamp in epoch seconds (0 when absent).
pub fn header_timestamp(message: &FeedMessage) -> u64 {
    message
        .header
        .as_ref()
        .and_then(|h| h.timestamp)
        .unwrap_or(0)
}
