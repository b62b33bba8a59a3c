use std::collections::BTreeMap;
use std::future::Future;

use crate::model::is_success_status;

/// One invocation of the load generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub url: String,
    pub request_count: u64,
    pub concurrency: u64,
}

/// Response outcomes as reported by the load generator.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcomes {
    /// One entry per request; `None` means no HTTP status (connect/read error, timeout).
    PerRequest(Vec<Option<u16>>),

    /// Aggregate counts only.
    Summary {
        status_counts: BTreeMap<u16, u64>,
        transport_errors: u64,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusTally {
    pub successes: u64,
    pub errors: u64,
}

impl StatusTally {
    #[must_use]
    pub fn total(self) -> u64 {
        self.successes.saturating_add(self.errors)
    }
}

impl ResponseOutcomes {
    /// Splits responses into 2xx successes and everything else.
    #[must_use]
    pub fn tally(&self) -> StatusTally {
        let mut tally = StatusTally::default();
        match self {
            Self::PerRequest(statuses) => {
                for status in statuses {
                    match status {
                        Some(code) if is_success_status(*code) => tally.successes += 1,
                        _ => tally.errors += 1,
                    }
                }
            }
            Self::Summary {
                status_counts,
                transport_errors,
            } => {
                for (code, n) in status_counts {
                    if is_success_status(*code) {
                        tally.successes = tally.successes.saturating_add(*n);
                    } else {
                        tally.errors = tally.errors.saturating_add(*n);
                    }
                }
                tally.errors = tally.errors.saturating_add(*transport_errors);
            }
        }
        tally
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub outcomes: ResponseOutcomes,
    pub average_latency_ms: Option<f64>,
    pub requests_per_sec: Option<f64>,

    /// Verbatim per-request output worth persisting next to the summary (if any).
    pub raw: Option<String>,
}

impl LoadReport {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            outcomes: ResponseOutcomes::PerRequest(Vec::new()),
            average_latency_ms: None,
            requests_per_sec: None,
            raw: None,
        }
    }
}

/// Executes load against the target and reports what came back.
///
/// Implementations are awaited one at a time. Dropping the returned future must abort the
/// in-flight load (the controller drops it on cancellation).
pub trait LoadGenerator {
    type Error: std::error::Error + Send + Sync + 'static;

    fn generate(
        &self,
        request: &LoadRequest,
    ) -> impl Future<Output = Result<LoadReport, Self::Error>>;
}
