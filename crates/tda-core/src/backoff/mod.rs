//! Failure backoff for scheduled feed fetches.
//!
//! A [`Backoff`] tracks the times of recent failed executions for one job.
//! The first `max_consecutive_failures` failures inside the reset window are
//! free; every further failure yields an escalating pause, perturbed by
//! jitter, rounded up to the scheduling quantum, and capped.
//!
//! Failures older than `pause_reset_period` are forgotten on every
//! observation, so a long enough quiet spell restarts escalation from zero.

mod policy;
mod random;

pub use policy::{Backoff, BackoffError, BackoffSettings};
pub use random::{jitter, quantize_duration, random_duration, UniformSource};
