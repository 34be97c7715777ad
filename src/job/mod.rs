//! Job lifecycle management.
//!
//! This module owns the submit/poll/fetch lifecycle of one analysis job and
//! the state machine behind it. CLI layers call into this module and consume
//! the events it emits.

mod controller;
mod state;

pub(crate) use controller::{run_job, JobCommand};
pub use state::{JobState, PollAction, MSG_POLL_FAILURE, MSG_SERVER_FAILURE, MSG_SUBMIT_FAILURE};
