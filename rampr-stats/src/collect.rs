use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

pub(crate) const RESPONSE_TIME_COLUMN: &str = "response-time";

/// Session id from `result-<digits>-<anything>.csv`.
pub(crate) fn extract_test_id(file_name: &str) -> Option<&str> {
    let rest = file_name.strip_prefix("result-")?;
    if !file_name.ends_with(".csv") {
        return None;
    }

    let digits = rest
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(rest.len(), |(idx, _)| idx);
    if digits == 0 || !rest[digits..].starts_with('-') {
        return None;
    }
    // The id and its dash must not overlap the extension.
    if digits + 1 > rest.len() - ".csv".len() {
        return None;
    }
    Some(&rest[..digits])
}

/// `result-*-*.csv` files in `dir`, sorted by name.
pub(crate) fn result_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("read directory {}", dir.display()))?;

    let mut out = Vec::new();
    for entry in entries {
        let path = entry.with_context(|| format!("read directory {}", dir.display()))?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let rest = name
            .strip_prefix("result-")
            .and_then(|r| r.strip_suffix(".csv"));
        if rest.is_some_and(|r| r.contains('-')) && path.is_file() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

/// Response times (seconds) from one raw hey CSV file.
pub(crate) fn read_response_times(path: &Path) -> Result<Vec<f64>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let column = reader
        .headers()?
        .iter()
        .position(|h| h.trim() == RESPONSE_TIME_COLUMN);
    let Some(column) = column else {
        bail!("missing `{RESPONSE_TIME_COLUMN}` column");
    };

    let mut out = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let Some(raw) = record.get(column).map(str::trim) else {
            continue;
        };
        if raw.is_empty() {
            continue;
        }
        let value: f64 = raw
            .parse()
            .with_context(|| format!("row {}: invalid response time '{raw}'", idx + 1))?;
        out.push(value);
    }
    Ok(out)
}

#[derive(Debug, Default)]
pub(crate) struct Collected {
    /// Response times per session id; ids sort as strings.
    pub by_test_id: BTreeMap<String, Vec<f64>>,
    pub files_seen: usize,
    pub files_loaded: usize,
}

/// Loads every result file in `dir`. Unreadable files are reported on stderr and skipped.
pub(crate) fn collect(dir: &Path) -> Result<Collected> {
    let mut collected = Collected::default();

    for path in result_files(dir)? {
        collected.files_seen += 1;

        let Some(test_id) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(extract_test_id)
            .map(str::to_string)
        else {
            continue;
        };

        match read_response_times(&path) {
            Ok(values) => {
                collected.files_loaded += 1;
                collected
                    .by_test_id
                    .entry(test_id)
                    .or_default()
                    .extend(values);
            }
            Err(err) => eprintln!("Error reading {}: {err:#}", path.display()),
        }
    }

    Ok(collected)
}
