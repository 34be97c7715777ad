//! HTTP client for the remote analysis service.
//!
//! Three calls only: submit a job, poll its status, fetch its result. All
//! failures are reported to the caller; there is no retry here.

use crate::model::{ResultResponse, RunConfig, StatusResponse, SubmitResponse};
use crate::submission::SubmissionInput;
use anyhow::{Context, Result};

pub struct AnalysisClient {
    http: reqwest::Client,
    base_url: String,
}

impl AnalysisClient {
    pub fn new(cfg: &RunConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.request_timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// POST /processar with the threshold and spreadsheet as multipart form
    /// data. Returns the opaque job identifier assigned by the service.
    pub async fn submit(&self, input: &SubmissionInput) -> Result<SubmitResponse> {
        let file_bytes = tokio::fs::read(&input.file)
            .await
            .with_context(|| format!("read spreadsheet {}", input.file.display()))?;
        let file_name = input
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.xlsx".to_string());

        let form = reqwest::multipart::Form::new()
            .text("valor_minimo", input.min_debt_value.to_string())
            .part(
                "file",
                reqwest::multipart::Part::bytes(file_bytes).file_name(file_name),
            );

        let resp = self
            .http
            .post(format!("{}/processar", self.base_url))
            .multipart(form)
            .send()
            .await
            .context("send processing request")?
            .error_for_status()
            .context("processing request rejected")?;

        resp.json::<SubmitResponse>()
            .await
            .context("decode submission response")
    }

    /// GET /status/{job_id}.
    pub async fn status(&self, job_id: &str) -> Result<StatusResponse> {
        let resp = self
            .http
            .get(format!("{}/status/{}", self.base_url, job_id))
            .send()
            .await
            .context("query job status")?
            .error_for_status()
            .context("status request rejected")?;

        resp.json::<StatusResponse>()
            .await
            .context("decode status response")
    }

    /// GET /resultado/{job_id}. Only meaningful once the job reports success;
    /// the service answers 400 for jobs still in flight.
    pub async fn result(&self, job_id: &str) -> Result<ResultResponse> {
        let resp = self
            .http
            .get(format!("{}/resultado/{}", self.base_url, job_id))
            .send()
            .await
            .context("fetch job result")?
            .error_for_status()
            .context("result request rejected")?;

        resp.json::<ResultResponse>()
            .await
            .context("decode result response")
    }
}
