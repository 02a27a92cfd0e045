//! Scheduler listeners: failure backoff and one-shot completion.

mod failure_response;
mod one_shot;

pub use failure_response::FailureResponseListener;
pub use one_shot::OneShotCompletionListener;
