use std::path::PathBuf;
use std::process::ExitStatus;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing required command: {0} (install it or pass --hey-bin)")]
    MissingTool(String),

    #[error("load generator binary does not exist: {}", .0.display())]
    ToolNotFound(PathBuf),

    #[error("failed to spawn {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("hey exited with {status}\n--- hey stderr (tail) ---\n{stderr}")]
    ToolFailed { status: ExitStatus, stderr: String },

    #[error("invalid hey csv output: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid hey output: {0}")]
    Parse(String),
}
