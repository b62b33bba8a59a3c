use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::Cli;
use crate::collect::collect;
use crate::latex::render_table;
use crate::stats::ResponseTimeSummary;

pub const NO_FILES_MESSAGE: &str = "No CSV files found in the provided directory.";
pub const NO_DATA_MESSAGE: &str = "No valid data could be loaded.";

/// What a report was built from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportCounts {
    pub files_seen: usize,
    pub files_loaded: usize,
    pub sessions: usize,
}

pub fn run(cli: Cli) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let counts = report(&cli.directory, &mut out)?;
    out.flush().context("flush stdout")?;

    if counts.files_seen > 0 {
        eprintln!(
            "Loaded {} of {} result files ({} sessions).",
            counts.files_loaded, counts.files_seen, counts.sessions
        );
    }
    Ok(())
}

/// Writes the LaTeX table (or one of the "nothing to report" messages) for `dir`.
pub fn report(dir: &Path, out: &mut impl Write) -> Result<ReportCounts> {
    let collected = collect(dir)?;
    let mut counts = ReportCounts {
        files_seen: collected.files_seen,
        files_loaded: collected.files_loaded,
        sessions: 0,
    };

    if collected.files_seen == 0 {
        writeln!(out, "{NO_FILES_MESSAGE}")?;
        return Ok(counts);
    }

    let summaries: Vec<(&str, ResponseTimeSummary)> = collected
        .by_test_id
        .iter()
        .filter_map(|(id, values)| {
            ResponseTimeSummary::from_values(values).map(|s| (id.as_str(), s))
        })
        .collect();

    if summaries.is_empty() {
        writeln!(out, "{NO_DATA_MESSAGE}")?;
        return Ok(counts);
    }

    counts.sessions = summaries.len();
    let table = render_table(summaries.iter().map(|(id, s)| (*id, s)));
    writeln!(out, "{table}")?;
    Ok(counts)
}
