use crate::client::AnalysisClient;
use crate::export::{self, DEFAULT_WORKBOOK_NAME};
use crate::job::{run_job, JobCommand, JobState};
use crate::model::{JobEvent, RemoteStatus, RunConfig};
use crate::render;
use crate::submission::SubmissionInput;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing: the rendered report goes to stdout, job progress to
/// stderr, so the report stays pipeable.
enum OutputLine {
    Report(String),
    Progress(String),
}

/// Spawn a blocking writer for both streams to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut report = std::io::LineWriter::new(stdout.lock());
        let mut progress = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Report(msg) => {
                    let _ = writeln!(report, "{}", msg);
                }
                OutputLine::Progress(msg) => {
                    // Keep report lines already queued ahead of any progress
                    // note that follows them.
                    let _ = report.flush();
                    let _ = writeln!(progress, "{}", msg);
                }
            }
        }

        let _ = report.flush();
        let _ = progress.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "pgfn-leads",
    version,
    about = "Submit a PGFN debtor spreadsheet for analysis and export the classified leads"
)]
pub struct Cli {
    /// Spreadsheet with the installment-plan data to analyse (.xlsx)
    pub file: std::path::PathBuf,

    /// Minimum debt value (R$) a debtor must have to be considered
    #[arg(long, default_value_t = 100_000.0)]
    pub min_debt: f64,

    /// Base URL of the analysis service
    #[arg(long, default_value = "http://localhost:8000")]
    pub base_url: String,

    /// Interval between job status checks
    #[arg(long, default_value = "5s")]
    pub poll_interval: humantime::Duration,

    /// Timeout for each HTTP request
    #[arg(long, default_value = "30s")]
    pub request_timeout: humantime::Duration,

    /// Path for the exported workbook (default: relatorio_analise_pgfn.xlsx)
    #[arg(long)]
    pub output: Option<std::path::PathBuf>,

    /// Also export the raw result payload as JSON
    #[arg(long)]
    pub export_json: Option<std::path::PathBuf>,

    /// Skip the workbook export
    #[arg(long)]
    pub no_export: bool,

    /// Print the result payload as JSON instead of tables
    #[arg(long)]
    pub json: bool,

    /// Suppress progress output (for cron usage)
    #[arg(long)]
    pub silent: bool,
}

/// Build a `RunConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> RunConfig {
    RunConfig {
        base_url: args.base_url.clone(),
        min_debt_value: args.min_debt,
        file: args.file.clone(),
        poll_interval: Duration::from(args.poll_interval),
        request_timeout: Duration::from(args.request_timeout),
        user_agent: format!("pgfn-leads-cli/{}", env!("CARGO_PKG_VERSION")),
    }
}

/// Reject a zero poll interval before it reaches the job timer, which
/// requires a non-zero period.
fn validate_poll_interval(interval: Duration) -> Result<()> {
    anyhow::ensure!(
        !interval.is_zero(),
        "poll interval must be greater than zero"
    );
    Ok(())
}

pub async fn run(args: Cli) -> Result<()> {
    let input = SubmissionInput::new(args.min_debt, args.file.clone());
    // Validation failures are surfaced before any network call is attempted.
    input.validate()?;
    validate_poll_interval(Duration::from(args.poll_interval))?;

    let cfg = build_config(&args);
    let client = AnalysisClient::new(&cfg)?;

    let (out_tx, out_handle) = spawn_output_writer();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<JobEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<JobCommand>();

    // Ctrl-C cancels the outstanding job; the controller tears the polling
    // timer down before returning.
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cmd_tx.send(JobCommand::Cancel);
        }
    });

    let handle = tokio::spawn(run_job(client, input, cfg.poll_interval, event_tx, cmd_rx));

    while let Some(ev) = event_rx.recv().await {
        if args.silent {
            continue;
        }
        match ev {
            JobEvent::Submitted { job_id } => {
                let _ = out_tx.send(OutputLine::Progress(format!("Job iniciado: {job_id}")));
            }
            JobEvent::StatusChecked { status } => {
                let label = match &status {
                    RemoteStatus::Pending(raw) if raw.is_empty() => "processando",
                    RemoteStatus::Pending(raw) => raw.as_str(),
                    RemoteStatus::Done => "concluido",
                    RemoteStatus::Failed => "erro",
                };
                let _ = out_tx.send(OutputLine::Progress(format!("Status: {label}")));
            }
            JobEvent::Info(msg) => {
                let _ = out_tx.send(OutputLine::Progress(msg));
            }
            JobEvent::Completed { .. } => {}
        }
    }

    let final_state = handle.await.context("job task failed")?;
    // Errors are folded into `res` instead of returned with `?` so the
    // output writer is always flushed before the process exits.
    let res = match final_state {
        JobState::Completed { payload } => emit_result(&args, &out_tx, &payload),
        JobState::Error { message } => Err(anyhow::anyhow!(message)),
        // A cancel resets the job; nothing to render or export.
        JobState::Idle => Ok(()),
        JobState::Processing { job_id } => Err(anyhow::anyhow!(
            "job {job_id} ended without reaching a terminal state"
        )),
    };

    drop(out_tx);
    let _ = out_handle.await;
    res
}

/// Print (or JSON-dump) a completed payload and run the configured exports.
fn emit_result(
    args: &Cli,
    out_tx: &mpsc::UnboundedSender<OutputLine>,
    payload: &crate::model::ResultPayload,
) -> Result<()> {
    if args.json {
        let out = serde_json::to_string_pretty(payload)?;
        let _ = out_tx.send(OutputLine::Report(out));
    } else {
        for line in render::build_report(payload).lines {
            let _ = out_tx.send(OutputLine::Report(line));
        }
    }

    if !args.no_export {
        let path = args
            .output
            .clone()
            .unwrap_or_else(|| std::path::PathBuf::from(DEFAULT_WORKBOOK_NAME));
        let written = export::export_workbook(payload, &path)?;
        let _ = out_tx.send(OutputLine::Progress(format!(
            "Relatório salvo: {}",
            written.display()
        )));
    }
    if let Some(path) = args.export_json.as_deref() {
        let written = export::export_json(payload, path)?;
        let _ = out_tx.send(OutputLine::Progress(format!(
            "JSON salvo: {}",
            written.display()
        )));
    }
    Ok(())
}
