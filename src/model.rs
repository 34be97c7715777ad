use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Snapshot of everything one analysis run needs, built from CLI arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub base_url: String,
    pub min_debt_value: f64,
    pub file: std::path::PathBuf,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    pub user_agent: String,
}

/// Client-side job lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobPhase {
    Idle,
    Processing,
    Completed,
    Error,
}

/// Status string reported by the analysis service for an outstanding job.
///
/// Only the two terminal spellings are recognized; everything else (the
/// service currently says "processando") keeps the polling loop alive, so a
/// new intermediate status on the server side never breaks the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    Pending(String),
    Done,
    Failed,
}

impl RemoteStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "concluido" => RemoteStatus::Done,
            "erro" => RemoteStatus::Failed,
            other => RemoteStatus::Pending(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RemoteStatus::Done | RemoteStatus::Failed)
    }
}

/// One classified record. Column sets are not guaranteed uniform across
/// records; rendering derives headers from the first record only.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// The two-way classified dataset returned for a completed job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    #[serde(default)]
    pub com_parcelamento: Vec<Record>,
    #[serde(default)]
    pub sem_parcelamento: Vec<Record>,
}

/// Response to POST /processar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub job_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response to GET /status/{job_id}.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub job_id: String,
    pub status: String,
}

/// Response to GET /resultado/{job_id}.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultResponse {
    pub job_id: String,
    pub resultado: ResultPayload,
}

/// Progress events emitted by the job controller and consumed by CLI layers.
#[derive(Debug, Clone)]
pub enum JobEvent {
    Submitted {
        job_id: String,
    },
    StatusChecked {
        status: RemoteStatus,
    },
    Completed {
        // Box to keep JobEvent small; payloads can hold thousands of records.
        payload: Box<ResultPayload>,
    },
    Info(String),
}
