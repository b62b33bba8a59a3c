use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use rampr_core::{Aggregation, PolicyKind};
use rampr_hey::HeyOutput;

pub(crate) fn parse_uri(input: &str) -> Result<String, String> {
    let s = input.trim();
    if !s.starts_with('/') {
        return Err(format!(
            "invalid URI '{s}' (expected a path starting with '/', e.g. /api/users)"
        ));
    }
    if s.chars().any(char::is_whitespace) {
        return Err(format!("invalid URI '{s}' (whitespace is not allowed)"));
    }
    Ok(s.to_string())
}

pub(crate) fn parse_threshold(input: &str) -> Result<f64, String> {
    let s = input.trim().trim_end_matches('%');
    let value: f64 = s.parse().map_err(|_| {
        format!("invalid threshold '{input}' (expected a percentage, e.g. 5 or 2.5)")
    })?;
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(format!("threshold '{input}' must be between 0 and 100"));
    }
    Ok(value)
}

fn parse_named<T: FromStr>(input: &str, what: &str, choices: &str) -> Result<T, String> {
    let s = input.trim();
    s.parse::<T>()
        .map_err(|_| format!("unsupported {what} '{s}'. Available: {choices}"))
}

pub(crate) fn parse_policy(input: &str) -> Result<PolicyKind, String> {
    parse_named(input, "policy", "doubling, staged")
}

pub(crate) fn parse_aggregation(input: &str) -> Result<Aggregation, String> {
    parse_named(input, "aggregation", "mean, pooled")
}

pub(crate) fn parse_output(input: &str) -> Result<HeyOutput, String> {
    parse_named(input, "output", "csv, summary")
}

#[derive(Debug, Parser)]
#[command(
    name = "rampr",
    author,
    version,
    about = "Adaptive load-escalation driver",
    long_about = "rampr drives an HTTP endpoint with waves of growing load using `hey`.\n\nEvery wave is repeated a few times; the runs' error rates are averaged and the escalation stops as soon as the average exceeds the threshold, or before a wave would exceed --max-requests.\n\nEvery run is written to a summary CSV in the output directory, and the raw per-request CSV from hey is kept next to it.",
    after_help = "Examples:\n  rampr /api/users\n  rampr -p 8080 -t 2.5 -m 20000 /health\n  rampr --policy staged --aggregation pooled /api/users\n  rampr --config rampr.yaml /api/users\n\nDocs: https://github.com/nogcio/rampr"
)]
pub struct Cli {
    /// Request path on the target host (must start with '/')
    #[arg(value_parser = parse_uri)]
    pub uri: String,

    /// Target port (default 8090)
    #[arg(short, long, env = "RAMPR_PORT", value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Output directory, created if missing (default ./results)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Never run a wave with more requests than this
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_requests: Option<u64>,

    /// Error-rate threshold in percent (default 5)
    #[arg(short, long, env = "RAMPR_THRESHOLD", value_parser = parse_threshold)]
    pub threshold: Option<f64>,

    /// Number of escalation sequences to run (default 3)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub runs: Option<u32>,

    /// Runs per wave whose error rates are averaged (default 3)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub wave_runs: Option<u32>,

    /// Wave sizing policy: doubling | staged (default doubling)
    #[arg(long, value_name = "POLICY", value_parser = parse_policy)]
    pub policy: Option<PolicyKind>,

    /// Initial request count (default 100 for doubling, 200 for staged)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub initial: Option<u64>,

    /// Concurrency is the request count divided by this (default 5)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub concurrency_divisor: Option<u64>,

    /// How run error rates are combined: mean | pooled (default mean)
    #[arg(long, value_name = "MODE", value_parser = parse_aggregation)]
    pub aggregation: Option<Aggregation>,

    /// hey output mode: csv | summary (default csv)
    #[arg(long, value_name = "MODE", value_parser = parse_output)]
    pub output: Option<HeyOutput>,

    /// Target host (default localhost)
    #[arg(long)]
    pub host: Option<String>,

    /// Path to the hey binary (otherwise looked up on PATH)
    #[arg(long, env = "RAMPR_HEY_BIN", value_name = "PATH")]
    pub hey_bin: Option<PathBuf>,

    /// YAML config file; CLI flags and env vars override its values
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
