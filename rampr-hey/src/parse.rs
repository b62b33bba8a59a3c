use std::collections::BTreeMap;

use rampr_core::{LoadReport, ResponseOutcomes};

use crate::error::{Error, Result};

const COL_RESPONSE_TIME: &str = "response-time";
const COL_STATUS_CODE: &str = "status-code";
const COL_OFFSET: &str = "offset";

/// Parses `hey -o csv` output: one row per answered request, times in seconds.
///
/// hey leaves transport failures out of the CSV entirely, so the rows alone undercount
/// errors; the caller knows how many requests were issued. A status of 0 is read as no
/// response.
pub(crate) fn parse_csv(text: &str) -> Result<LoadReport> {
    if text.trim().is_empty() {
        return Ok(LoadReport::empty());
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::Parse(format!("missing `{name}` column")))
    };
    let rt_idx = column(COL_RESPONSE_TIME)?;
    let status_idx = column(COL_STATUS_CODE)?;
    let offset_idx = column(COL_OFFSET).ok();

    let mut statuses = Vec::new();
    let mut latency_sum = 0.0f64;
    let mut span_secs = 0.0f64;

    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let field = |idx: usize| {
            record.get(idx).ok_or_else(|| {
                Error::Parse(format!("row {}: expected at least {} fields", line + 1, idx + 1))
            })
        };

        let rt: f64 = field(rt_idx)?
            .parse()
            .map_err(|_| Error::Parse(format!("row {}: invalid response-time", line + 1)))?;
        let status: u16 = field(status_idx)?
            .parse()
            .map_err(|_| Error::Parse(format!("row {}: invalid status-code", line + 1)))?;

        if let Some(idx) = offset_idx
            && let Some(offset) = record.get(idx).and_then(|v| v.parse::<f64>().ok())
        {
            span_secs = span_secs.max(offset + rt);
        }

        latency_sum += rt;
        statuses.push((status != 0).then_some(status));
    }

    let n = statuses.len();
    let average_latency_ms = (n > 0).then(|| latency_sum / n as f64 * 1000.0);
    let requests_per_sec = (n > 0 && span_secs > 0.0).then(|| n as f64 / span_secs);

    Ok(LoadReport {
        outcomes: ResponseOutcomes::PerRequest(statuses),
        average_latency_ms,
        requests_per_sec,
        raw: Some(text.to_string()),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Other,
    StatusCodes,
    Errors,
}

/// Parses hey's default text summary.
pub(crate) fn parse_summary(text: &str) -> Result<LoadReport> {
    let mut requests_per_sec: Option<f64> = None;
    let mut average_secs: Option<f64> = None;
    let mut status_counts: BTreeMap<u16, u64> = BTreeMap::new();
    let mut transport_errors = 0u64;
    let mut section = Section::Other;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            section = Section::Other;
            continue;
        }

        if line.starts_with("Status code distribution:") {
            section = Section::StatusCodes;
            continue;
        }
        if line.starts_with("Error distribution:") {
            section = Section::Errors;
            continue;
        }

        match section {
            Section::StatusCodes => {
                // [200]	95 responses
                let (code, count) = parse_bracketed(line)
                    .ok_or_else(|| Error::Parse(format!("invalid status code line: {line}")))?;
                let code: u16 = code
                    .parse()
                    .map_err(|_| Error::Parse(format!("invalid status code: {code}")))?;
                let count = leading_u64(count)
                    .ok_or_else(|| Error::Parse(format!("invalid response count: {line}")))?;
                *status_counts.entry(code).or_default() += count;
            }
            Section::Errors => {
                // [5]	Get "http://...": dial tcp ...: connection refused
                let (count, _) = parse_bracketed(line)
                    .ok_or_else(|| Error::Parse(format!("invalid error line: {line}")))?;
                let count: u64 = count
                    .parse()
                    .map_err(|_| Error::Parse(format!("invalid error count: {line}")))?;
                transport_errors = transport_errors.saturating_add(count);
            }
            Section::Other => {
                if let Some(rest) = line.strip_prefix("Requests/sec:") {
                    requests_per_sec = first_f64(rest);
                } else if average_secs.is_none()
                    && let Some(rest) = line.strip_prefix("Average:")
                {
                    average_secs = first_f64(rest);
                }
            }
        }
    }

    if requests_per_sec.is_none() && status_counts.is_empty() && transport_errors == 0 {
        return Err(Error::Parse(format!(
            "no summary found in hey output\n--- hey stdout (tail) ---\n{}",
            last_lines(text, 12)
        )));
    }

    Ok(LoadReport {
        outcomes: ResponseOutcomes::Summary {
            status_counts,
            transport_errors,
        },
        average_latency_ms: average_secs.map(|s| s * 1000.0),
        requests_per_sec,
        raw: None,
    })
}

fn parse_bracketed(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix('[')?;
    let end = rest.find(']')?;
    Some((rest[..end].trim(), rest[end + 1..].trim()))
}

fn leading_u64(s: &str) -> Option<u64> {
    s.split_whitespace().next()?.parse().ok()
}

fn first_f64(s: &str) -> Option<f64> {
    s.split_whitespace().next()?.parse().ok()
}

/// Last `max_lines` non-blank lines of tool output. hey pads its reports with blank lines.
pub(crate) fn last_lines(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(max_lines)..].join("\n")
}
