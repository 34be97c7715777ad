//! Job lifecycle controller.
//!
//! Owns the submit → poll → fetch-result orchestration for a single job and
//! emits events for presentation layers. The polling timer lives entirely
//! inside `run_job`; every exit path drops it, so no poll can fire after a
//! terminal transition, a cancel, or teardown.

use crate::client::AnalysisClient;
use crate::job::state::{JobState, PollAction};
use crate::model::{JobEvent, RemoteStatus};
use crate::submission::SubmissionInput;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by UI layers to control the outstanding job.
#[derive(Debug, Clone)]
pub(crate) enum JobCommand {
    Cancel,
}

/// Run one job to a terminal state and return it.
///
/// Failures are folded into `JobState::Error`; the caller decides how to
/// surface them. A cancel (or a closed command channel, which is how teardown
/// looks from here) resets the job and returns `JobState::Idle`.
pub(crate) async fn run_job(
    client: AnalysisClient,
    input: SubmissionInput,
    poll_interval: Duration,
    event_tx: UnboundedSender<JobEvent>,
    mut cmd_rx: UnboundedReceiver<JobCommand>,
) -> JobState {
    let mut state = JobState::Idle;

    match client.submit(&input).await {
        Ok(resp) => {
            let _ = event_tx.send(JobEvent::Submitted {
                job_id: resp.job_id.clone(),
            });
            if let Some(msg) = resp.message {
                let _ = event_tx.send(JobEvent::Info(msg));
            }
            state.on_submitted(resp.job_id);
        }
        Err(e) => {
            let _ = event_tx.send(JobEvent::Info(format!("Falha no envio: {e:#}")));
            state.on_submit_failed();
            return state;
        }
    }
    let job_id = match state.job_id() {
        Some(id) => id.to_string(),
        None => return state,
    };

    let mut ticker = tokio::time::interval(poll_interval);
    // The first interval tick completes immediately; consume it so the first
    // status query happens a full interval after submission.
    ticker.tick().await;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                // Cancel command, or the sender side went away on teardown.
                // Either way the timer must die with the job.
                let _ = cmd;
                let _ = event_tx.send(JobEvent::Info("Consulta cancelada.".into()));
                state.reset();
                return state;
            }
            _ = ticker.tick() => {
                let status = match client.status(&job_id).await {
                    Ok(resp) => RemoteStatus::parse(&resp.status),
                    Err(e) => {
                        let _ = event_tx.send(JobEvent::Info(format!(
                            "Falha ao consultar status: {e:#}"
                        )));
                        state.on_transport_error();
                        return state;
                    }
                };
                let _ = event_tx.send(JobEvent::StatusChecked {
                    status: status.clone(),
                });

                match state.on_status(&status) {
                    PollAction::Continue => {}
                    PollAction::Stop => return state,
                    PollAction::FetchResult => {
                        match client.result(&job_id).await {
                            Ok(resp) => {
                                let _ = event_tx.send(JobEvent::Completed {
                                    payload: Box::new(resp.resultado.clone()),
                                });
                                state.on_result(resp.resultado);
                            }
                            Err(e) => {
                                let _ = event_tx.send(JobEvent::Info(format!(
                                    "Falha ao obter resultado: {e:#}"
                                )));
                                state.on_transport_error();
                            }
                        }
                        return state;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    /// Minimal analysis-service stand-in: answers the three endpoints with
    /// canned JSON and counts how many status queries it has served.
    struct StubService {
        addr: std::net::SocketAddr,
        status_hits: Arc<AtomicUsize>,
    }

    async fn spawn_stub(status_body: &'static str) -> StubService {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let status_hits = Arc::new(AtomicUsize::new(0));
        let hits = status_hits.clone();

        tokio::spawn(async move {
            loop {
                let Ok((mut sock, _)) = listener.accept().await else {
                    break;
                };
                let hits = hits.clone();
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut tmp = [0u8; 4096];
                    // Read the head, then drain the declared body so the
                    // client never sees a reset mid-upload.
                    let (head_end, content_len) = loop {
                        let n = sock.read(&mut tmp).await.unwrap_or(0);
                        if n == 0 {
                            return;
                        }
                        buf.extend_from_slice(&tmp[..n]);
                        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                            let head = String::from_utf8_lossy(&buf[..pos]).to_string();
                            let len = head
                                .lines()
                                .find_map(|l| {
                                    l.to_ascii_lowercase()
                                        .strip_prefix("content-length:")
                                        .and_then(|v| v.trim().parse::<usize>().ok())
                                })
                                .unwrap_or(0);
                            break (pos + 4, len);
                        }
                    };
                    while buf.len() < head_end + content_len {
                        let n = sock.read(&mut tmp).await.unwrap_or(0);
                        if n == 0 {
                            break;
                        }
                        buf.extend_from_slice(&tmp[..n]);
                    }

                    let request_line = String::from_utf8_lossy(&buf)
                        .lines()
                        .next()
                        .unwrap_or_default()
                        .to_string();
                    let body = if request_line.starts_with("POST /processar") {
                        r#"{"job_id":"abc123","message":"Processamento iniciado."}"#
                    } else if request_line.starts_with("GET /status/") {
                        hits.fetch_add(1, Ordering::SeqCst);
                        status_body
                    } else if request_line.starts_with("GET /resultado/") {
                        r#"{"job_id":"abc123","resultado":{"com_parcelamento":[{"cnpj":"01"}],"sem_parcelamento":[]}}"#
                    } else {
                        "{}"
                    };
                    let resp = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = sock.write_all(resp.as_bytes()).await;
                    let _ = sock.shutdown().await;
                });
            }
        });

        StubService { addr, status_hits }
    }

    fn config(base_url: &str) -> RunConfig {
        RunConfig {
            base_url: base_url.to_string(),
            min_debt_value: 150_000.0,
            file: std::path::PathBuf::from("input.xlsx"),
            poll_interval: Duration::from_millis(10),
            request_timeout: Duration::from_secs(1),
            user_agent: "pgfn-leads-test".to_string(),
        }
    }

    #[tokio::test]
    async fn failed_submission_ends_in_error_state() {
        // Port 1 is unassigned; the connection is refused before any poll
        // timer is ever created.
        let cfg = config("http://127.0.0.1:1");
        let client = AnalysisClient::new(&cfg).unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"xlsx").unwrap();
        let input = SubmissionInput::new(cfg.min_debt_value, file.path());

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let (_cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let state = run_job(client, input, cfg.poll_interval, event_tx, cmd_rx).await;
        assert_eq!(
            state,
            JobState::Error {
                message: crate::job::state::MSG_SUBMIT_FAILURE.to_string()
            }
        );
        // No Submitted event was emitted, only the failure info.
        let first = event_rx.recv().await.unwrap();
        assert!(matches!(first, JobEvent::Info(_)));
    }

    fn stub_input(min_debt: f64) -> (tempfile::NamedTempFile, SubmissionInput) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"xlsx").unwrap();
        let input = SubmissionInput::new(min_debt, file.path());
        (file, input)
    }

    #[tokio::test]
    async fn cancel_resets_job_before_any_poll() {
        let stub = spawn_stub(r#"{"job_id":"abc123","status":"processando"}"#).await;
        let cfg = config(&format!("http://{}", stub.addr));
        let client = AnalysisClient::new(&cfg).unwrap();
        let (_file, input) = stub_input(cfg.min_debt_value);

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        // A long interval keeps the first status query far away; the cancel
        // must win the race every time.
        let handle = tokio::spawn(run_job(
            client,
            input,
            Duration::from_secs(60),
            event_tx,
            cmd_rx,
        ));

        loop {
            match event_rx.recv().await.unwrap() {
                JobEvent::Submitted { job_id } => {
                    assert_eq!(job_id, "abc123");
                    break;
                }
                JobEvent::Info(_) => {}
                other => panic!("unexpected event before submission: {other:?}"),
            }
        }
        cmd_tx.send(JobCommand::Cancel).unwrap();

        let state = handle.await.unwrap();
        assert_eq!(state, JobState::Idle);
        assert_eq!(stub.status_hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn teardown_of_command_channel_stops_polling() {
        let stub = spawn_stub(r#"{"job_id":"abc123","status":"processando"}"#).await;
        let cfg = config(&format!("http://{}", stub.addr));
        let client = AnalysisClient::new(&cfg).unwrap();
        let (_file, input) = stub_input(cfg.min_debt_value);

        let (event_tx, _event_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<JobCommand>();
        // Dropping the sender is what teardown looks like to the controller.
        drop(cmd_tx);

        let state = run_job(client, input, Duration::from_secs(60), event_tx, cmd_rx).await;
        assert_eq!(state, JobState::Idle);
        assert_eq!(stub.status_hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn success_status_polls_once_and_fetches_result() {
        let stub = spawn_stub(r#"{"job_id":"abc123","status":"concluido"}"#).await;
        let cfg = config(&format!("http://{}", stub.addr));
        let client = AnalysisClient::new(&cfg).unwrap();
        let (_file, input) = stub_input(cfg.min_debt_value);

        let (event_tx, _event_rx) = mpsc::unbounded_channel();
        let (_cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let state = run_job(
            client,
            input,
            Duration::from_millis(20),
            event_tx,
            cmd_rx,
        )
        .await;

        let JobState::Completed { payload } = state else {
            panic!("expected completed state");
        };
        assert_eq!(payload.com_parcelamento.len(), 1);
        assert!(payload.sem_parcelamento.is_empty());

        // The loop is gone; waiting several intervals must not produce
        // another status query.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(stub.status_hits.load(Ordering::SeqCst), 1);
    }
}
