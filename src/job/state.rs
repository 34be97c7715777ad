//! Explicit job state machine.
//!
//! The lifecycle {idle, processing, completed, error} is a tagged union so
//! invalid combinations (a payload without a completed job, an error message
//! in a healthy run) are unrepresentable. Transitions are pure and carry no
//! IO, which keeps them testable without a server.

use crate::model::{JobPhase, RemoteStatus, ResultPayload};

/// User-facing failure messages, kept in the service's language to match
/// what its operators expect to read.
pub const MSG_SUBMIT_FAILURE: &str = "Falha ao enviar a requisição de processamento.";
pub const MSG_POLL_FAILURE: &str =
    "Não foi possível comunicar com o servidor para verificar o status.";
pub const MSG_SERVER_FAILURE: &str = "Ocorreu um erro no processamento no servidor.";

/// Lifecycle state of the single job owned by a run.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Idle,
    Processing { job_id: String },
    Completed { payload: ResultPayload },
    Error { message: String },
}

/// What the polling loop should do after observing a remote status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollAction {
    /// Status still pending; keep the timer running.
    Continue,
    /// Remote reported success; fetch the result payload once.
    FetchResult,
    /// Remote reported failure; tear the timer down.
    Stop,
}

impl JobState {
    pub fn phase(&self) -> JobPhase {
        match self {
            JobState::Idle => JobPhase::Idle,
            JobState::Processing { .. } => JobPhase::Processing,
            JobState::Completed { .. } => JobPhase::Completed,
            JobState::Error { .. } => JobPhase::Error,
        }
    }

    pub fn job_id(&self) -> Option<&str> {
        match self {
            JobState::Processing { job_id } => Some(job_id),
            _ => None,
        }
    }

    /// idle → processing, storing the identifier verbatim. Any other source
    /// state is a bug in the caller; the transition is refused.
    pub fn on_submitted(&mut self, job_id: String) -> bool {
        if matches!(self, JobState::Idle) {
            *self = JobState::Processing { job_id };
            true
        } else {
            false
        }
    }

    /// idle → error on a failed submission call.
    pub fn on_submit_failed(&mut self) {
        *self = JobState::Error {
            message: MSG_SUBMIT_FAILURE.to_string(),
        };
    }

    /// Apply one poll response while processing. Terminal statuses move the
    /// state; pending statuses leave it untouched and the loop continues.
    pub fn on_status(&mut self, status: &RemoteStatus) -> PollAction {
        match status {
            RemoteStatus::Pending(_) => PollAction::Continue,
            RemoteStatus::Done => PollAction::FetchResult,
            RemoteStatus::Failed => {
                *self = JobState::Error {
                    message: MSG_SERVER_FAILURE.to_string(),
                };
                PollAction::Stop
            }
        }
    }

    /// processing → completed once the result payload has been fetched in
    /// full. Partial results never reach this point.
    pub fn on_result(&mut self, payload: ResultPayload) {
        *self = JobState::Completed { payload };
    }

    /// processing → error when a poll or result-fetch call itself fails.
    pub fn on_transport_error(&mut self) {
        *self = JobState::Error {
            message: MSG_POLL_FAILURE.to_string(),
        };
    }

    /// Back to idle, clearing identifier, payload and error message. Safe to
    /// call from any state, any number of times.
    pub fn reset(&mut self) {
        *self = JobState::Idle;
    }
}
