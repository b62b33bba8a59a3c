use crate::generator::LoadReport;

/// Rounds half away from zero to two decimal places.
#[must_use]
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[must_use]
pub fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Parameters of one escalation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveSpec {
    pub request_count: u64,
    pub concurrency: u64,
}

impl WaveSpec {
    /// Concurrency is `request_count / divisor`, floored, never below 1.
    #[must_use]
    pub fn derive(request_count: u64, concurrency_divisor: u64) -> Self {
        let concurrency = (request_count / concurrency_divisor.max(1)).max(1);
        Self {
            request_count,
            concurrency,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub request_count: u64,
    pub concurrency: u64,
    pub error_count: u64,
    pub total_count: u64,
    /// Percentage of non-2xx responses, rounded to 2 decimals. Exactly 0 when nothing came back.
    pub error_rate_pct: f64,
    pub average_latency_ms: Option<f64>,
    pub requests_per_sec: Option<f64>,
}

impl RunResult {
    #[must_use]
    pub fn new(spec: WaveSpec, error_count: u64, total_count: u64) -> Self {
        let error_count = error_count.min(total_count);
        let error_rate_pct = if total_count == 0 {
            0.0
        } else {
            round2(error_count as f64 / total_count as f64 * 100.0)
        };

        Self {
            request_count: spec.request_count,
            concurrency: spec.concurrency,
            error_count,
            total_count,
            error_rate_pct,
            average_latency_ms: None,
            requests_per_sec: None,
        }
    }

    #[must_use]
    pub fn from_report(spec: WaveSpec, report: &LoadReport) -> Self {
        let tally = report.outcomes.tally();
        Self {
            average_latency_ms: report.average_latency_ms.map(round2),
            requests_per_sec: report.requests_per_sec.map(round2),
            ..Self::new(spec, tally.errors, tally.total())
        }
    }

    /// The load generator produced no responses at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }
}

/// How the runs of one wave are reduced to a single error rate.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::EnumString, strum::Display,
)]
pub enum Aggregation {
    /// Arithmetic mean of the per-run error rates; every run weighs the same.
    #[default]
    #[strum(to_string = "mean", serialize = "mean-of-runs")]
    MeanOfRuns,

    /// One error rate over the errors and responses of all runs combined.
    #[strum(to_string = "pooled")]
    Pooled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaveOutcome {
    pub spec: WaveSpec,
    pub runs: Vec<RunResult>,
    pub average_error_rate: f64,
}

/// Ordinals identifying one run across the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunContext {
    pub sequence: u32,
    pub wave: u32,
    pub run: u32,
    /// Session-wide run number, starting at 1.
    pub run_counter: u64,
}

/// Mutable session state, owned by the controller and handed from wave to wave.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub request_count: u64,
    pub run_counter: u64,
    pub waves_completed: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_is_floored_with_minimum_of_one() {
        assert_eq!(WaveSpec::derive(100, 5).concurrency, 20);
        assert_eq!(WaveSpec::derive(104, 5).concurrency, 20);
        assert_eq!(WaveSpec::derive(3, 5).concurrency, 1);
        assert_eq!(WaveSpec::derive(3, 0).concurrency, 3);
    }

    #[test]
    fn error_rate_is_zero_without_responses() {
        let r = RunResult::new(WaveSpec::derive(100, 5), 0, 0);
        assert_eq!(r.error_rate_pct, 0.0);
        assert!(r.is_empty());
    }

    #[test]
    fn error_rate_is_rounded_to_two_decimals() {
        let r = RunResult::new(WaveSpec::derive(300, 5), 1, 3);
        assert_eq!(r.error_rate_pct, 33.33);

        let r = RunResult::new(WaveSpec::derive(300, 5), 2, 3);
        assert_eq!(r.error_rate_pct, 66.67);
    }

    #[test]
    fn error_rate_stays_within_bounds() {
        let r = RunResult::new(WaveSpec::derive(10, 5), 50, 10);
        assert_eq!(r.error_count, 10);
        assert_eq!(r.error_rate_pct, 100.0);
    }

    #[test]
    fn success_status_range_is_half_open() {
        assert!(!is_success_status(199));
        assert!(is_success_status(200));
        assert!(is_success_status(299));
        assert!(!is_success_status(300));
        assert!(!is_success_status(500));
    }

    #[test]
    fn aggregation_parses_cli_names() {
        assert_eq!("mean".parse::<Aggregation>().ok(), Some(Aggregation::MeanOfRuns));
        assert_eq!("pooled".parse::<Aggregation>().ok(), Some(Aggregation::Pooled));
        assert!("median".parse::<Aggregation>().is_err());
        assert_eq!(Aggregation::MeanOfRuns.to_string(), "mean");
    }
}
