use rampr_core::{SessionOutcome, SizingPolicy as _, run_session};
use rampr_hey::{HeyGenerator, HeyTool};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cli::Cli;
use crate::config::{ConfigFile, Settings};
use crate::exit_codes::ExitCode;
use crate::logging;
use crate::record::{CsvRecorder, new_session_id, prepare_output_dir};
use crate::run_error::{RunError, classify_core_error, classify_hey_error};

pub async fn run(cli: Cli) -> Result<ExitCode, RunError> {
    let file = match cli.config.as_deref() {
        Some(path) => ConfigFile::load(path).map_err(RunError::InvalidInput)?,
        None => ConfigFile::default(),
    };
    let settings = Settings::resolve(cli, file).map_err(RunError::InvalidInput)?;

    let cfg = settings.controller_config();
    cfg.validate().map_err(classify_core_error)?;
    let policy = settings.wave_policy().map_err(classify_core_error)?;

    let tool = HeyTool::detect(settings.hey_bin.as_deref()).map_err(classify_hey_error)?;
    prepare_output_dir(&settings.dir).map_err(RunError::OutputDir)?;

    let session = new_session_id();
    // Dropping the guard flushes the session log; it must outlive every log line below.
    let _log_guard = logging::init(&settings.dir, &session).map_err(RunError::OutputDir)?;

    log_settings(&settings, &session, &tool, policy.initial_request_count());

    let cancel = CancellationToken::new();
    let listener = spawn_interrupt_listener(cancel.clone()).map_err(RunError::RuntimeError)?;

    let generator = HeyGenerator::new(tool, settings.output);
    let mut recorder = CsvRecorder::new(&settings.dir, &session);

    let res = run_session(&cfg, &policy, &generator, &mut recorder, &cancel).await;
    listener.abort();

    tracing::info!(
        "wrote {} file(s) to {}",
        recorder.files_written().len(),
        settings.dir.display()
    );

    match res {
        Ok(outcome) => Ok(log_outcome(&session, &outcome)),
        Err(err) => {
            let err = classify_core_error(err);
            tracing::error!("session {session} failed: {err}");
            Err(err)
        }
    }
}

fn spawn_interrupt_listener(cancel: CancellationToken) -> anyhow::Result<JoinHandle<()>> {
    // Registered before returning so an early SIGINT is never handled by the default disposition.
    #[cfg(unix)]
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

    Ok(tokio::spawn(async move {
        #[cfg(unix)]
        let received = sigint.recv().await.is_some();
        #[cfg(not(unix))]
        let received = tokio::signal::ctrl_c().await.is_ok();

        if received {
            tracing::warn!("interrupt received, stopping");
            cancel.cancel();
        }
    }))
}

fn log_settings(settings: &Settings, session: &str, tool: &HeyTool, initial: u64) {
    tracing::info!("rampr session {session}");
    tracing::info!("target: {}", settings.url());
    tracing::info!(
        "policy: {}, initial {initial} requests, concurrency = requests / {}",
        settings.policy,
        settings.concurrency_divisor
    );
    match settings.max_requests {
        Some(max) => tracing::info!(
            "threshold: {:.2}% error rate, max {max} requests",
            settings.threshold_pct
        ),
        None => tracing::info!(
            "threshold: {:.2}% error rate, no request cap",
            settings.threshold_pct
        ),
    }
    tracing::info!(
        "{} sequence(s), {} run(s) per wave, {} aggregation",
        settings.runs,
        settings.wave_runs,
        settings.aggregation
    );
    tracing::info!("output: {}", settings.dir.display());
    tracing::info!("hey: {} ({} output)", tool.path().display(), settings.output);
}

fn log_outcome(session: &str, outcome: &SessionOutcome) -> ExitCode {
    for seq in &outcome.sequences {
        tracing::info!(
            "sequence {}: {} wave(s), {}",
            seq.sequence,
            seq.waves_run,
            seq.reason
        );
    }

    if outcome.interrupted() {
        tracing::warn!(
            "session {session} interrupted after {} run(s)",
            outcome.state.run_counter
        );
        return ExitCode::Interrupted;
    }

    tracing::info!(
        "session {session} finished: {} sequence(s), {} run(s)",
        outcome.sequences.len(),
        outcome.state.run_counter
    );
    ExitCode::Success
}
