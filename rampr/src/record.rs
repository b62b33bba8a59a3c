use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use rampr_core::{Recorder, RunContext, RunResult};
use serde::{Serialize, Serializer};

pub(crate) const SUMMARY_HEADER: [&str; 10] = [
    "Sequence",
    "Wave",
    "Run",
    "Requests",
    "Concurrency",
    "Average Latency (ms)",
    "Requests/sec",
    "Error Rate (%)",
    "Errors",
    "Total",
];

#[derive(Debug, thiserror::Error)]
pub(crate) enum RecordError {
    #[error("failed to create {}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write summary row: {0}")]
    Csv(#[from] csv::Error),
}

/// Local timestamp with millisecond precision, digits only.
#[must_use]
pub(crate) fn new_session_id() -> String {
    chrono::Local::now().format("%Y%m%d%H%M%S%3f").to_string()
}

/// Creates `dir` if needed and checks that files can be created in it.
pub(crate) fn prepare_output_dir(dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    if !dir.is_dir() {
        anyhow::bail!("output path is not a directory: {}", dir.display());
    }

    tempfile::Builder::new()
        .prefix(".rampr-write-check-")
        .tempfile_in(dir)
        .with_context(|| format!("output directory is not writable: {}", dir.display()))?;
    Ok(())
}

#[must_use]
pub(crate) fn summary_path(dir: &Path, session: &str, sequence: u32) -> PathBuf {
    dir.join(format!("waves-{session}-{sequence}.csv"))
}

#[must_use]
pub(crate) fn raw_result_path(dir: &Path, session: &str, run_counter: u64) -> PathBuf {
    dir.join(format!("result-{session}-{run_counter}.csv"))
}

/// One line of a `waves-*.csv` file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub(crate) struct SummaryRow {
    #[serde(rename = "Sequence")]
    pub sequence: u32,
    #[serde(rename = "Wave")]
    pub wave: u32,
    #[serde(rename = "Run")]
    pub run: u32,
    #[serde(rename = "Requests")]
    pub request_count: u64,
    #[serde(rename = "Concurrency")]
    pub concurrency: u64,
    #[serde(rename = "Average Latency (ms)", serialize_with = "opt_two_decimals")]
    pub average_latency_ms: Option<f64>,
    #[serde(rename = "Requests/sec", serialize_with = "opt_two_decimals")]
    pub requests_per_sec: Option<f64>,
    #[serde(rename = "Error Rate (%)", serialize_with = "two_decimals")]
    pub error_rate_pct: f64,
    #[serde(rename = "Errors")]
    pub error_count: u64,
    #[serde(rename = "Total")]
    pub total_count: u64,
}

impl SummaryRow {
    fn new(ctx: &RunContext, result: &RunResult) -> Self {
        Self {
            sequence: ctx.sequence,
            wave: ctx.wave,
            run: ctx.run,
            request_count: result.request_count,
            concurrency: result.concurrency,
            average_latency_ms: result.average_latency_ms,
            requests_per_sec: result.requests_per_sec,
            error_rate_pct: result.error_rate_pct,
            error_count: result.error_count,
            total_count: result.total_count,
        }
    }
}

fn two_decimals<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{v:.2}"))
}

fn opt_two_decimals<S: Serializer>(v: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
    match v {
        Some(v) => two_decimals(v, s),
        None => s.serialize_str(""),
    }
}

/// Reads a `waves-*.csv` file back.
#[cfg(test)]
pub(crate) fn read_summary(path: &Path) -> anyhow::Result<Vec<SummaryRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut rows = Vec::new();
    for (idx, row) in reader.deserialize::<SummaryRow>().enumerate() {
        rows.push(row.with_context(|| format!("{}: invalid row {}", path.display(), idx + 1))?);
    }
    Ok(rows)
}

fn create_new(path: &Path) -> Result<File, RecordError> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|source| RecordError::Create {
            path: path.to_path_buf(),
            source,
        })
}

/// The open `waves-*.csv` of the current sequence.
#[derive(Debug)]
struct SummaryFile {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl SummaryFile {
    fn flush(&mut self) -> Result<(), RecordError> {
        self.writer.flush().map_err(|source| RecordError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// Writes one summary CSV per sequence and keeps hey's raw per-request output per run.
#[derive(Debug)]
pub(crate) struct CsvRecorder {
    dir: PathBuf,
    session: String,
    summary: Option<SummaryFile>,
    files_written: Vec<PathBuf>,
}

impl CsvRecorder {
    #[must_use]
    pub(crate) fn new(dir: impl Into<PathBuf>, session: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            session: session.into(),
            summary: None,
            files_written: Vec::new(),
        }
    }

    /// Every file created so far, in creation order.
    #[must_use]
    pub(crate) fn files_written(&self) -> &[PathBuf] {
        &self.files_written
    }

    fn close_summary(&mut self) -> Result<(), RecordError> {
        match self.summary.take() {
            Some(mut summary) => summary.flush(),
            None => Ok(()),
        }
    }
}

impl Recorder for CsvRecorder {
    type Error = RecordError;

    fn begin_sequence(&mut self, sequence: u32) -> Result<(), Self::Error> {
        self.close_summary()?;

        let path = summary_path(&self.dir, &self.session, sequence);
        let file = create_new(&path)?;
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        let mut summary = SummaryFile {
            path: path.clone(),
            writer,
        };
        summary.writer.write_record(SUMMARY_HEADER)?;
        summary.flush()?;

        tracing::debug!("recording sequence {sequence} to {}", path.display());
        self.files_written.push(path);
        self.summary = Some(summary);
        Ok(())
    }

    fn record_run(
        &mut self,
        ctx: &RunContext,
        result: &RunResult,
        raw: Option<&str>,
    ) -> Result<(), Self::Error> {
        if self.summary.is_none() {
            self.begin_sequence(ctx.sequence)?;
        }

        if let Some(raw) = raw {
            let path = raw_result_path(&self.dir, &self.session, ctx.run_counter);
            let mut file = create_new(&path)?;
            file.write_all(raw.as_bytes())
                .and_then(|()| file.flush())
                .map_err(|source| RecordError::Write {
                    path: path.clone(),
                    source,
                })?;
            self.files_written.push(path);
        }

        if let Some(summary) = self.summary.as_mut() {
            summary.writer.serialize(SummaryRow::new(ctx, result))?;
            summary.flush()?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Self::Error> {
        self.close_summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rampr_core::WaveSpec;

    fn ctx(sequence: u32, wave: u32, run: u32, run_counter: u64) -> RunContext {
        RunContext {
            sequence,
            wave,
            run,
            run_counter,
        }
    }

    fn result(request_count: u64, errors: u64, total: u64) -> RunResult {
        RunResult {
            average_latency_ms: Some(12.5),
            requests_per_sec: Some(1500.0),
            ..RunResult::new(WaveSpec::derive(request_count, 5), errors, total)
        }
    }

    #[test]
    fn session_id_is_seventeen_digits() {
        let id = new_session_id();
        assert_eq!(id.len(), 17, "{id}");
        assert!(id.chars().all(|c| c.is_ascii_digit()), "{id}");
    }

    #[test]
    fn summary_round_trips() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut rec = CsvRecorder::new(dir.path(), "1");

        rec.begin_sequence(1)?;
        rec.record_run(&ctx(1, 1, 1, 1), &result(100, 0, 100), None)?;
        rec.record_run(&ctx(1, 1, 2, 2), &result(100, 1, 3), None)?;
        let empty = RunResult::new(WaveSpec::derive(200, 5), 0, 0);
        rec.record_run(&ctx(1, 2, 1, 3), &empty, None)?;
        rec.finish()?;

        let rows = read_summary(&summary_path(dir.path(), "1", 1))?;
        anyhow::ensure!(rows.len() == 3, "rows: {rows:?}");

        anyhow::ensure!(rows[1].request_count == 100);
        anyhow::ensure!(rows[1].concurrency == 20);
        anyhow::ensure!((rows[1].error_rate_pct - 33.33).abs() < 0.01);
        anyhow::ensure!(rows[1].average_latency_ms.is_some_and(|v| (v - 12.5).abs() < 0.01));
        anyhow::ensure!(rows[2].concurrency == 40);
        anyhow::ensure!(rows[2].error_rate_pct == 0.0);
        anyhow::ensure!(rows[2].average_latency_ms.is_none());
        Ok(())
    }

    #[test]
    fn header_is_written_even_without_rows() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut rec = CsvRecorder::new(dir.path(), "7");
        rec.begin_sequence(2)?;
        rec.finish()?;

        let text = std::fs::read_to_string(summary_path(dir.path(), "7", 2))?;
        anyhow::ensure!(text.trim_end() == SUMMARY_HEADER.join(","), "{text}");
        Ok(())
    }

    #[test]
    fn rows_are_on_disk_before_finish() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut rec = CsvRecorder::new(dir.path(), "s");
        rec.begin_sequence(1)?;
        rec.record_run(&ctx(1, 1, 1, 1), &result(100, 5, 100), None)?;

        let rows = read_summary(&summary_path(dir.path(), "s", 1))?;
        anyhow::ensure!(rows.len() == 1);
        anyhow::ensure!(rows[0].error_rate_pct == 5.0);
        Ok(())
    }

    #[test]
    fn raw_output_is_kept_per_run() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut rec = CsvRecorder::new(dir.path(), "s");
        rec.begin_sequence(1)?;
        rec.record_run(&ctx(1, 1, 1, 4), &result(100, 0, 1), Some("response-time\n0.01\n"))?;
        rec.finish()?;

        let raw = std::fs::read_to_string(raw_result_path(dir.path(), "s", 4))?;
        anyhow::ensure!(raw == "response-time\n0.01\n");
        anyhow::ensure!(rec.files_written().len() == 2);
        Ok(())
    }

    #[test]
    fn existing_files_are_not_overwritten() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(summary_path(dir.path(), "s", 1), "keep me")?;

        let mut rec = CsvRecorder::new(dir.path(), "s");
        let err = rec.begin_sequence(1).err();
        anyhow::ensure!(matches!(err, Some(RecordError::Create { .. })), "{err:?}");
        anyhow::ensure!(std::fs::read_to_string(summary_path(dir.path(), "s", 1))? == "keep me");
        Ok(())
    }

    #[test]
    fn prepare_output_dir_creates_and_rejects_files() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let nested = dir.path().join("a").join("b");
        prepare_output_dir(&nested)?;
        anyhow::ensure!(nested.is_dir());

        let file = dir.path().join("plain");
        std::fs::write(&file, "")?;
        anyhow::ensure!(prepare_output_dir(&file).is_err());
        Ok(())
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn flush_failure_names_the_summary_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut rec = CsvRecorder::new(dir.path(), "s");
        let path = summary_path(dir.path(), "s", 3);

        let full = OpenOptions::new().write(true).open("/dev/full")?;
        let mut writer = csv::Writer::from_writer(full);
        writer.write_record(SUMMARY_HEADER)?;
        rec.summary = Some(SummaryFile {
            path: path.clone(),
            writer,
        });

        match rec.finish() {
            Err(err @ RecordError::Write { .. }) => {
                let msg = err.to_string();
                anyhow::ensure!(msg.contains("waves-s-3.csv"), "{msg}");
                anyhow::ensure!(msg == format!("failed to write {}", path.display()), "{msg}");
            }
            other => anyhow::bail!("expected a write error, got {other:?}"),
        }
        anyhow::ensure!(rec.summary.is_none());
        Ok(())
    }
}
