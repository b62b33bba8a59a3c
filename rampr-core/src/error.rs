pub type Result<T> = std::result::Result<T, Error>;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("`threshold` must be a finite percentage between 0 and 100")]
    InvalidThreshold,

    #[error("`runs_per_wave` must be a positive integer")]
    InvalidRunsPerWave,

    #[error("`runs` must be a positive integer")]
    InvalidRuns,

    #[error("`initial` request count must be a positive integer")]
    InvalidInitialRequestCount,

    #[error("`concurrency_divisor` must be a positive integer")]
    InvalidConcurrencyDivisor,

    #[error("`max_requests` must be a positive integer")]
    InvalidMaxRequests,

    #[error(
        "load generator failed (sequence {sequence}, wave {wave}, run {run}, requests={request_count}, concurrency={concurrency})"
    )]
    Generator {
        sequence: u32,
        wave: u32,
        run: u32,
        request_count: u64,
        concurrency: u64,
        #[source]
        source: BoxError,
    },

    #[error("failed to record run (sequence {sequence}, wave {wave}, run {run})")]
    Recorder {
        sequence: u32,
        wave: u32,
        run: u32,
        #[source]
        source: BoxError,
    },

    #[error("failed to finalize recorder")]
    RecorderFinish(#[source] BoxError),
}
