//! Live JSON feeds
//!
//! Each named feed is served by a [`DataStream`] distributor that keeps one
//! upstream TCP connection open while it has subscribers. The upstream
//! protocol is a single handshake line carrying the feed name, followed by
//! newline-delimited JSON events.

mod cache;
mod codec;
mod distributor;
mod error;
mod registry;

pub use cache::{RecencyCache, DEFAULT_CACHE_CAPACITY};
pub use codec::{JsonReader, JsonWriter};
pub use distributor::{
    DataStream, DistributorConfig, Event, EventSender, StreamState, StreamStatus, SubscriptionId,
};
pub use error::{CodecError, StreamError, StreamResult};
pub use registry::StreamRegistry;
