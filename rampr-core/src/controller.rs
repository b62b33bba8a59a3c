use std::fmt;

use tokio_util::sync::CancellationToken;

use crate::aggregate::{RunAggregator, WaveStep};
use crate::error::{Error, Result};
use crate::generator::LoadGenerator;
use crate::model::{Aggregation, SessionState, WaveOutcome};
use crate::recorder::Recorder;
use crate::sizing::SizingPolicy;

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Full target URL handed to the load generator.
    pub url: String,
    /// Stop once a wave's error rate strictly exceeds this percentage.
    pub threshold_pct: f64,
    /// Never run a wave larger than this.
    pub max_requests: Option<u64>,
    pub runs_per_wave: u32,
    /// Number of independent escalation sequences in one session.
    pub sequences: u32,
    pub aggregation: Aggregation,
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.threshold_pct.is_finite() || !(0.0..=100.0).contains(&self.threshold_pct) {
            return Err(Error::InvalidThreshold);
        }
        if self.runs_per_wave == 0 {
            return Err(Error::InvalidRunsPerWave);
        }
        if self.sequences == 0 {
            return Err(Error::InvalidRuns);
        }
        if self.max_requests == Some(0) {
            return Err(Error::InvalidMaxRequests);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    /// The wave's error rate exceeded the threshold.
    Threshold {
        request_count: u64,
        average_error_rate: f64,
        threshold_pct: f64,
    },

    /// The next wave would exceed the request cap; it was not run.
    Cap {
        request_count: u64,
        max_requests: u64,
    },

    /// The sizing policy could not grow past `request_count`.
    Exhausted { request_count: u64 },

    /// Cancelled while a wave was running.
    Interrupted { request_count: u64 },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Threshold {
                request_count,
                average_error_rate,
                threshold_pct,
            } => write!(
                f,
                "threshold exceeded: average error rate {average_error_rate:.2}% > {threshold_pct:.2}% at {request_count} requests"
            ),
            Self::Cap {
                request_count,
                max_requests,
            } => write!(
                f,
                "request cap reached: next wave of {request_count} requests exceeds max {max_requests}"
            ),
            Self::Exhausted { request_count } => write!(
                f,
                "request count cannot grow beyond {request_count}"
            ),
            Self::Interrupted { request_count } => {
                write!(f, "interrupted during wave of {request_count} requests")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControllerState {
    Running,
    Stopped(StopReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SequenceOutcome {
    pub sequence: u32,
    pub reason: StopReason,
    pub waves_run: u32,
    /// Last wave that completed all of its runs.
    pub last_wave: Option<WaveOutcome>,
}

impl SequenceOutcome {
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self.reason, StopReason::Interrupted { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub sequences: Vec<SequenceOutcome>,
    pub state: SessionState,
}

impl SessionOutcome {
    #[must_use]
    pub fn interrupted(&self) -> bool {
        self.sequences.iter().any(SequenceOutcome::is_interrupted)
    }
}

/// Runs one escalation sequence from the policy's initial size to a terminal state.
///
/// `state` is handed back so the session-wide run counter carries into the next sequence.
pub async fn run_sequence<P, G, R>(
    cfg: &ControllerConfig,
    policy: &P,
    generator: &G,
    recorder: &mut R,
    mut state: SessionState,
    sequence: u32,
    cancel: &CancellationToken,
) -> Result<(SequenceOutcome, SessionState)>
where
    P: SizingPolicy,
    G: LoadGenerator,
    R: Recorder,
{
    state.request_count = policy.initial_request_count();
    state.waves_completed = 0;

    recorder
        .begin_sequence(sequence)
        .map_err(|e| Error::Recorder {
            sequence,
            wave: 0,
            run: 0,
            source: Box::new(e),
        })?;

    let mut aggregator = RunAggregator {
        generator,
        recorder,
        url: &cfg.url,
        runs_per_wave: cfg.runs_per_wave,
        aggregation: cfg.aggregation,
        cancel,
    };

    let mut last_wave: Option<WaveOutcome> = None;
    let mut waves_run = 0u32;

    let reason = loop {
        let spec = policy.wave_spec(state.request_count);

        if let Some(max_requests) = cfg.max_requests
            && spec.request_count > max_requests
        {
            break StopReason::Cap {
                request_count: spec.request_count,
                max_requests,
            };
        }

        let wave = waves_run + 1;
        tracing::info!(
            "sequence {sequence} wave {wave}: {} requests, concurrency {}",
            spec.request_count,
            spec.concurrency
        );

        waves_run = wave;
        let outcome = match aggregator.run_wave(spec, sequence, wave, &mut state).await? {
            WaveStep::Completed(outcome) => outcome,
            WaveStep::Interrupted { .. } => {
                break StopReason::Interrupted {
                    request_count: spec.request_count,
                };
            }
        };

        state.waves_completed += 1;
        tracing::info!(
            "sequence {sequence} wave {wave}: average error rate {:.2}% ({}, threshold {:.2}%)",
            outcome.average_error_rate,
            cfg.aggregation,
            cfg.threshold_pct
        );

        let control = decide(cfg, policy, &mut state, &outcome);
        last_wave = Some(outcome);

        if let ControllerState::Stopped(reason) = control {
            break reason;
        }
    };

    let outcome = SequenceOutcome {
        sequence,
        reason,
        waves_run,
        last_wave,
    };
    log_stop(&outcome);

    Ok((outcome, state))
}

/// Threshold check and advance to the next wave size.
fn decide<P: SizingPolicy>(
    cfg: &ControllerConfig,
    policy: &P,
    state: &mut SessionState,
    outcome: &WaveOutcome,
) -> ControllerState {
    if outcome.average_error_rate > cfg.threshold_pct {
        return ControllerState::Stopped(StopReason::Threshold {
            request_count: outcome.spec.request_count,
            average_error_rate: outcome.average_error_rate,
            threshold_pct: cfg.threshold_pct,
        });
    }

    let next = policy.next_request_count(state.request_count);
    if next <= state.request_count {
        return ControllerState::Stopped(StopReason::Exhausted {
            request_count: state.request_count,
        });
    }

    state.request_count = next;
    ControllerState::Running
}

fn log_stop(outcome: &SequenceOutcome) {
    let sequence = outcome.sequence;
    match &outcome.reason {
        reason @ StopReason::Interrupted { .. } => {
            tracing::warn!("sequence {sequence} stopped: {reason}");
        }
        reason => tracing::info!("sequence {sequence} stopped: {reason}"),
    }

    if let Some(wave) = &outcome.last_wave {
        tracing::info!(
            "sequence {sequence} final wave: {} requests, concurrency {}, {} run(s), average error rate {:.2}%",
            wave.spec.request_count,
            wave.spec.concurrency,
            wave.runs.len(),
            wave.average_error_rate
        );
    }
}

/// Runs `cfg.sequences` independent escalation sequences.
///
/// An interrupt ends the session after the interrupted sequence. The recorder is finished on
/// every path that returns `Ok`.
pub async fn run_session<P, G, R>(
    cfg: &ControllerConfig,
    policy: &P,
    generator: &G,
    recorder: &mut R,
    cancel: &CancellationToken,
) -> Result<SessionOutcome>
where
    P: SizingPolicy,
    G: LoadGenerator,
    R: Recorder,
{
    cfg.validate()?;

    let mut state = SessionState::default();
    let mut sequences = Vec::new();

    for sequence in 1..=cfg.sequences {
        tracing::info!("starting sequence {sequence}/{}", cfg.sequences);

        let res = run_sequence(
            cfg,
            policy,
            generator,
            recorder,
            state.clone(),
            sequence,
            cancel,
        )
        .await;
        let (outcome, next_state) = match res {
            Ok(v) => v,
            Err(err) => {
                // Best effort: keep what was already written.
                if let Err(finish_err) = recorder.finish() {
                    tracing::warn!("failed to finalize recorder after error: {finish_err}");
                }
                return Err(err);
            }
        };

        state = next_state;
        let interrupted = outcome.is_interrupted();
        sequences.push(outcome);
        if interrupted {
            break;
        }
    }

    recorder
        .finish()
        .map_err(|e| Error::RecorderFinish(Box::new(e)))?;

    Ok(SessionOutcome { sequences, state })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RunResult, WaveSpec};
    use crate::sizing::{PolicyKind, WavePolicy};

    fn cfg() -> ControllerConfig {
        ControllerConfig {
            url: "http://localhost:8090/".to_string(),
            threshold_pct: 5.0,
            max_requests: None,
            runs_per_wave: 3,
            sequences: 1,
            aggregation: Aggregation::MeanOfRuns,
        }
    }

    fn outcome(request_count: u64, rate_errors: u64) -> WaveOutcome {
        let spec = WaveSpec::derive(request_count, 5);
        let run = RunResult::new(spec, rate_errors, 100);
        WaveOutcome {
            spec,
            average_error_rate: run.error_rate_pct,
            runs: vec![run],
        }
    }

    fn doubling() -> WavePolicy {
        WavePolicy::new(PolicyKind::Doubling, None, 5).unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn decide_stops_only_when_strictly_above_threshold() {
        let policy = doubling();
        let mut state = SessionState {
            request_count: 100,
            ..SessionState::default()
        };

        let at_threshold = decide(&cfg(), &policy, &mut state, &outcome(100, 5));
        assert_eq!(at_threshold, ControllerState::Running);
        assert_eq!(state.request_count, 200);

        let above = decide(&cfg(), &policy, &mut state, &outcome(200, 6));
        assert!(matches!(
            above,
            ControllerState::Stopped(StopReason::Threshold { request_count: 200, .. })
        ));
        assert_eq!(state.request_count, 200);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut c = cfg();
        c.threshold_pct = f64::NAN;
        assert!(matches!(c.validate(), Err(Error::InvalidThreshold)));

        let mut c = cfg();
        c.threshold_pct = 101.0;
        assert!(matches!(c.validate(), Err(Error::InvalidThreshold)));

        let mut c = cfg();
        c.runs_per_wave = 0;
        assert!(matches!(c.validate(), Err(Error::InvalidRunsPerWave)));

        let mut c = cfg();
        c.sequences = 0;
        assert!(matches!(c.validate(), Err(Error::InvalidRuns)));

        let mut c = cfg();
        c.max_requests = Some(0);
        assert!(matches!(c.validate(), Err(Error::InvalidMaxRequests)));

        assert!(cfg().validate().is_ok());
    }

    #[test]
    fn stop_reasons_render_two_decimals() {
        let r = StopReason::Threshold {
            request_count: 800,
            average_error_rate: 10.0,
            threshold_pct: 5.0,
        };
        assert_eq!(
            r.to_string(),
            "threshold exceeded: average error rate 10.00% > 5.00% at 800 requests"
        );

        let r = StopReason::Cap {
            request_count: 2000,
            max_requests: 1000,
        };
        assert_eq!(
            r.to_string(),
            "request cap reached: next wave of 2000 requests exceeds max 1000"
        );
    }
}
