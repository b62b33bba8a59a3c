use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::writer::MakeWriterExt as _;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `[YYYY-MM-DD HH:MM:SS]` in local time.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SessionClock;

impl FormatTime for SessionClock {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "[{}]", chrono::Local::now().format(TIMESTAMP_FORMAT))
    }
}

#[must_use]
pub(crate) fn session_log_path(dir: &Path, session: &str) -> PathBuf {
    dir.join(format!("session-{session}.log"))
}

/// Installs the global subscriber: stdout plus an append-only session log in `dir`.
///
/// The returned guard flushes the log file when dropped; keep it alive until the session ends.
pub(crate) fn init(dir: &Path, session: &str) -> anyhow::Result<WorkerGuard> {
    let path = session_log_path(dir, session);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open session log {}", path.display()))?;

    let (file_writer, guard) = tracing_appender::non_blocking(file);

    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => tracing_subscriber::EnvFilter::new("info"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(SessionClock)
        .with_level(false)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stdout.and(file_writer))
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_renders_bracketed_timestamp() {
        let mut buf = String::new();
        let res = SessionClock.format_time(&mut Writer::new(&mut buf));
        assert!(res.is_ok());

        // [2024-01-31 12:34:56]
        assert_eq!(buf.len(), 21, "{buf}");
        assert!(buf.starts_with('[') && buf.ends_with(']'), "{buf}");
        let inner = &buf[1..20];
        assert!(
            chrono::NaiveDateTime::parse_from_str(inner, TIMESTAMP_FORMAT).is_ok(),
            "{inner}"
        );
    }

    #[test]
    fn log_file_is_named_after_session() {
        let p = session_log_path(Path::new("/tmp/out"), "20240131123456789");
        assert_eq!(p, PathBuf::from("/tmp/out/session-20240131123456789.log"));
    }
}
