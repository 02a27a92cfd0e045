//! One conditional fetch, parse, and classify cycle for a feed.
//!
//! A cycle always produces a [`FetchResult`]; network, HTTP and parse
//! failures are reported in-band as [`FetchStatus::Error`]. Only failures
//! that say nothing about the remote feed (a request that cannot be built, a
//! row that cannot be serialized, a fallback write that fails) escape as
//! errors.

mod classify;
mod executor;
mod request;
mod result;

pub use classify::{classify_response, is_unchanged};
pub use executor::{FeedArchiveJob, FetchExecutor};
pub use request::{build_request, FeedDescriptor};
pub use result::{ConditionalGetState, FetchResult, FetchStatus};
