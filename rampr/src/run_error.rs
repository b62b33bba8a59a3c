use crate::exit_codes::ExitCode;

#[derive(Debug)]
pub enum RunError {
    InvalidInput(anyhow::Error),
    OutputDir(anyhow::Error),
    MissingTool(anyhow::Error),
    RuntimeError(anyhow::Error),
}

impl RunError {
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidInput(_) => ExitCode::InvalidInput,
            Self::OutputDir(_) => ExitCode::OutputDir,
            Self::MissingTool(_) => ExitCode::MissingTool,
            Self::RuntimeError(_) => ExitCode::RuntimeError,
        }
    }

    #[must_use]
    pub fn anyhow(&self) -> &anyhow::Error {
        match self {
            Self::InvalidInput(e)
            | Self::OutputDir(e)
            | Self::MissingTool(e)
            | Self::RuntimeError(e) => e,
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.anyhow())
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.anyhow().as_ref())
    }
}

/// Maps a controller error to the exit code class it belongs to.
pub(crate) fn classify_core_error(err: rampr_core::Error) -> RunError {
    use rampr_core::Error as CoreError;

    match err {
        CoreError::InvalidThreshold
        | CoreError::InvalidRunsPerWave
        | CoreError::InvalidRuns
        | CoreError::InvalidInitialRequestCount
        | CoreError::InvalidConcurrencyDivisor
        | CoreError::InvalidMaxRequests => RunError::InvalidInput(anyhow::Error::new(err)),

        CoreError::Generator { .. } | CoreError::Recorder { .. } | CoreError::RecorderFinish(_) => {
            RunError::RuntimeError(anyhow::Error::new(err))
        }
    }
}

pub(crate) fn classify_hey_error(err: rampr_hey::Error) -> RunError {
    match err {
        rampr_hey::Error::MissingTool(_) | rampr_hey::Error::ToolNotFound(_) => {
            RunError::MissingTool(anyhow::Error::new(err))
        }
        _ => RunError::RuntimeError(anyhow::Error::new(err)),
    }
}
