//! Scheduled GTFS-realtime feed archiving: conditional fetches, failure
//! backoff, and at-least-once persistence to ClickHouse with a local-file
//! fallback. Trackernet line predictions run on the same scheduler.

pub mod archiver;
pub mod backoff;
pub mod config;
pub mod fallback;
pub mod fetch;
pub mod gtfs_rt;
pub mod http;
pub mod listeners;
pub mod logging;
pub mod metrics;
pub mod scheduler;
pub mod sink;
pub mod trackernet;

#[cfg(test)]
mod test_support;
