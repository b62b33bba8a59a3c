use rampr_core::{LoadGenerator, LoadReport, LoadRequest, ResponseOutcomes};
use tokio::process::Command;

use crate::error::Error;
use crate::parse::{parse_csv, parse_summary};
use crate::runner::{command_to_string, run_to_completion};
use crate::tool::HeyTool;

/// Which of hey's output formats to request and parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::EnumString, strum::Display)]
pub enum HeyOutput {
    /// `-o csv`: one row per request. Kept verbatim for later analysis.
    #[default]
    #[strum(to_string = "csv")]
    Csv,

    /// Default text summary with status code distribution.
    #[strum(to_string = "summary")]
    Summary,
}

/// [`LoadGenerator`] backed by the `hey` CLI.
#[derive(Debug, Clone)]
pub struct HeyGenerator {
    tool: HeyTool,
    output: HeyOutput,
}

impl HeyGenerator {
    #[must_use]
    pub fn new(tool: HeyTool, output: HeyOutput) -> Self {
        Self { tool, output }
    }

    fn command(&self, request: &LoadRequest) -> Command {
        let mut cmd = Command::new(self.tool.path());
        cmd.arg("-n")
            .arg(request.request_count.to_string())
            .arg("-c")
            .arg(request.concurrency.to_string());
        if self.output == HeyOutput::Csv {
            cmd.args(["-o", "csv"]);
        }
        cmd.arg(&request.url);
        cmd
    }
}

impl LoadGenerator for HeyGenerator {
    type Error = Error;

    async fn generate(&self, request: &LoadRequest) -> Result<LoadReport, Self::Error> {
        let cmd = self.command(request);
        tracing::debug!("hey: {}", command_to_string(&cmd));

        let stdout = run_to_completion(cmd).await?;
        tracing::debug!("hey: {} bytes of {} output", stdout.len(), self.output);

        match self.output {
            HeyOutput::Csv => {
                let mut report = parse_csv(&stdout)?;
                count_missing_rows(&mut report, issued_requests(request));
                Ok(report)
            }
            HeyOutput::Summary => parse_summary(&stdout),
        }
    }
}

/// hey splits `-n` evenly across `-c` workers and drops the remainder.
fn issued_requests(request: &LoadRequest) -> u64 {
    let concurrency = request.concurrency.max(1);
    (request.request_count / concurrency) * concurrency
}

/// hey writes CSV rows only for requests that got a response. Every issued request without a
/// row failed at the transport level (refused, reset, timed out) and counts as an error.
///
/// Output without even a header line is left alone and surfaces as a no-data run.
fn count_missing_rows(report: &mut LoadReport, issued: u64) {
    if report.raw.is_none() {
        return;
    }
    let ResponseOutcomes::PerRequest(statuses) = &mut report.outcomes else {
        return;
    };

    let missing = issued.saturating_sub(statuses.len() as u64);
    if missing > 0 {
        tracing::debug!(
            "hey: {missing} of {issued} requests have no csv row, counted as transport errors"
        );
        statuses.extend(std::iter::repeat_n(None, missing as usize));
    }
}
