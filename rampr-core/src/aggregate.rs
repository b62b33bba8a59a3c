use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::generator::{LoadGenerator, LoadReport, LoadRequest};
use crate::model::{
    Aggregation, RunContext, RunResult, SessionState, WaveOutcome, WaveSpec, round2,
};
use crate::recorder::Recorder;

/// Reduces the runs of one wave to the error rate the controller decides on.
#[must_use]
pub fn aggregate_error_rate(runs: &[RunResult], mode: Aggregation) -> f64 {
    if runs.is_empty() {
        return 0.0;
    }

    match mode {
        Aggregation::MeanOfRuns => {
            let sum: f64 = runs.iter().map(|r| r.error_rate_pct).sum();
            round2(sum / runs.len() as f64)
        }
        Aggregation::Pooled => {
            let errors: u64 = runs.iter().map(|r| r.error_count).sum();
            let total: u64 = runs.iter().map(|r| r.total_count).sum();
            if total == 0 {
                0.0
            } else {
                round2(errors as f64 / total as f64 * 100.0)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WaveStep {
    Completed(WaveOutcome),

    /// Cancelled while a run was in flight; that run was not recorded.
    Interrupted { runs_completed: Vec<RunResult> },
}

/// Runs one wave: `runs_per_wave` strictly sequential load generator invocations.
pub struct RunAggregator<'a, G, R> {
    pub generator: &'a G,
    pub recorder: &'a mut R,
    pub url: &'a str,
    pub runs_per_wave: u32,
    pub aggregation: Aggregation,
    pub cancel: &'a CancellationToken,
}

impl<G, R> RunAggregator<'_, G, R>
where
    G: LoadGenerator,
    R: Recorder,
{
    pub async fn run_wave(
        &mut self,
        spec: WaveSpec,
        sequence: u32,
        wave: u32,
        state: &mut SessionState,
    ) -> Result<WaveStep> {
        let mut runs = Vec::new();

        for run in 1..=self.runs_per_wave {
            let request = LoadRequest {
                url: self.url.to_string(),
                request_count: spec.request_count,
                concurrency: spec.concurrency,
            };

            tracing::info!(
                "sequence {sequence} wave {wave} run {run}/{}: {} requests, concurrency {}",
                self.runs_per_wave,
                spec.request_count,
                spec.concurrency
            );

            let Some(report) = self.generate(&request, sequence, wave, run).await? else {
                return Ok(WaveStep::Interrupted {
                    runs_completed: runs,
                });
            };

            let result = RunResult::from_report(spec, &report);
            state.run_counter += 1;
            let ctx = RunContext {
                sequence,
                wave,
                run,
                run_counter: state.run_counter,
            };

            if result.is_empty() {
                tracing::warn!(
                    "sequence {sequence} wave {wave} run {run}: no data (load generator returned no responses), error rate counted as 0.00%"
                );
            } else {
                tracing::info!(
                    "sequence {sequence} wave {wave} run {run}: {}/{} errors, error rate {:.2}%, avg latency {}, {} req/s",
                    result.error_count,
                    result.total_count,
                    result.error_rate_pct,
                    display_opt(result.average_latency_ms, " ms"),
                    display_opt(result.requests_per_sec, "")
                );
            }

            self.recorder
                .record_run(&ctx, &result, report.raw.as_deref())
                .map_err(|e| Error::Recorder {
                    sequence,
                    wave,
                    run,
                    source: Box::new(e),
                })?;

            runs.push(result);
        }

        let average_error_rate = aggregate_error_rate(&runs, self.aggregation);
        Ok(WaveStep::Completed(WaveOutcome {
            spec,
            runs,
            average_error_rate,
        }))
    }

    /// `Ok(None)` when cancelled before or during the invocation.
    async fn generate(
        &self,
        request: &LoadRequest,
        sequence: u32,
        wave: u32,
        run: u32,
    ) -> Result<Option<LoadReport>> {
        if self.cancel.is_cancelled() {
            return Ok(None);
        }

        let res = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Ok(None),
            res = self.generator.generate(request) => res,
        };

        // A generator that finishes after an interrupt may have been cut short by the same signal.
        if self.cancel.is_cancelled() {
            return Ok(None);
        }

        res.map(Some).map_err(|e| Error::Generator {
            sequence,
            wave,
            run,
            request_count: request.request_count,
            concurrency: request.concurrency,
            source: Box::new(e),
        })
    }
}

fn display_opt(v: Option<f64>, unit: &str) -> String {
    match v {
        Some(v) => format!("{v:.2}{unit}"),
        None => "-".to_string(),
    }
}
