use std::path::{Path, PathBuf};

use anyhow::Context as _;
use rampr_core::{
    Aggregation, ControllerConfig, DEFAULT_CONCURRENCY_DIVISOR, PolicyKind, WavePolicy,
};
use rampr_hey::HeyOutput;
use serde::Deserialize;

use crate::cli::{Cli, parse_aggregation, parse_output, parse_policy, parse_threshold, parse_uri};

pub(crate) const DEFAULT_PORT: u16 = 8090;
pub(crate) const DEFAULT_DIR: &str = "./results";
pub(crate) const DEFAULT_THRESHOLD_PCT: f64 = 5.0;
pub(crate) const DEFAULT_RUNS: u32 = 3;
pub(crate) const DEFAULT_WAVE_RUNS: u32 = 3;
pub(crate) const DEFAULT_HOST: &str = "localhost";

/// Optional YAML file; every key mirrors a CLI flag.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub(crate) struct ConfigFile {
    pub port: Option<u16>,
    pub dir: Option<PathBuf>,
    pub max_requests: Option<u64>,
    pub threshold: Option<f64>,
    pub runs: Option<u32>,
    pub wave_runs: Option<u32>,
    pub policy: Option<String>,
    pub initial: Option<u64>,
    pub concurrency_divisor: Option<u64>,
    pub aggregation: Option<String>,
    pub output: Option<String>,
    pub host: Option<String>,
    pub hey_bin: Option<PathBuf>,
}

impl ConfigFile {
    pub(crate) fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub(crate) fn parse(text: &str) -> anyhow::Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }
}

/// Fully resolved session settings.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Settings {
    pub uri: String,
    pub host: String,
    pub port: u16,
    pub dir: PathBuf,
    pub max_requests: Option<u64>,
    pub threshold_pct: f64,
    pub runs: u32,
    pub wave_runs: u32,
    pub policy: PolicyKind,
    pub initial: Option<u64>,
    pub concurrency_divisor: u64,
    pub aggregation: Aggregation,
    pub output: HeyOutput,
    pub hey_bin: Option<PathBuf>,
}

impl Settings {
    /// Merges CLI values (which already include env vars) over the config file and defaults.
    pub(crate) fn resolve(cli: Cli, file: ConfigFile) -> anyhow::Result<Self> {
        let uri = parse_uri(&cli.uri).map_err(anyhow::Error::msg)?;

        let threshold_pct = match (cli.threshold, file.threshold) {
            (Some(v), _) => v,
            (None, Some(v)) => parse_threshold(&v.to_string())
                .map_err(anyhow::Error::msg)
                .context("config `threshold`")?,
            (None, None) => DEFAULT_THRESHOLD_PCT,
        };

        let policy = match (cli.policy, file.policy.as_deref()) {
            (Some(v), _) => v,
            (None, Some(s)) => parse_policy(s)
                .map_err(anyhow::Error::msg)
                .context("config `policy`")?,
            (None, None) => PolicyKind::default(),
        };
        let aggregation = match (cli.aggregation, file.aggregation.as_deref()) {
            (Some(v), _) => v,
            (None, Some(s)) => parse_aggregation(s)
                .map_err(anyhow::Error::msg)
                .context("config `aggregation`")?,
            (None, None) => Aggregation::default(),
        };
        let output = match (cli.output, file.output.as_deref()) {
            (Some(v), _) => v,
            (None, Some(s)) => parse_output(s)
                .map_err(anyhow::Error::msg)
                .context("config `output`")?,
            (None, None) => HeyOutput::default(),
        };

        let port = cli.port.or(file.port).unwrap_or(DEFAULT_PORT);
        if port == 0 {
            anyhow::bail!("`port` must be between 1 and 65535");
        }

        let host = cli
            .host
            .or(file.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        if host.trim().is_empty() || host.contains(['/', ' ']) {
            anyhow::bail!("invalid host '{host}'");
        }

        Ok(Self {
            uri,
            host,
            port,
            dir: cli
                .dir
                .or(file.dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DIR)),
            max_requests: cli.max_requests.or(file.max_requests),
            threshold_pct,
            runs: cli.runs.or(file.runs).unwrap_or(DEFAULT_RUNS),
            wave_runs: cli.wave_runs.or(file.wave_runs).unwrap_or(DEFAULT_WAVE_RUNS),
            policy,
            initial: cli.initial.or(file.initial),
            concurrency_divisor: cli
                .concurrency_divisor
                .or(file.concurrency_divisor)
                .unwrap_or(DEFAULT_CONCURRENCY_DIVISOR),
            aggregation,
            output,
            hey_bin: cli.hey_bin.or(file.hey_bin),
        })
    }

    #[must_use]
    pub(crate) fn url(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, self.uri)
    }

    #[must_use]
    pub(crate) fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            url: self.url(),
            threshold_pct: self.threshold_pct,
            max_requests: self.max_requests,
            runs_per_wave: self.wave_runs,
            sequences: self.runs,
            aggregation: self.aggregation,
        }
    }

    pub(crate) fn wave_policy(&self) -> rampr_core::Result<WavePolicy> {
        WavePolicy::new(self.policy, self.initial, self.concurrency_divisor)
    }
}
