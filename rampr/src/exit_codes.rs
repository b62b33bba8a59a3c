#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// The escalation finished normally (threshold exceeded or request cap reached).
    Success = 0,

    /// Invalid CLI/config input (bad flags, bad URI, unreadable config file, out-of-range values).
    InvalidInput = 30,

    /// Output directory could not be created or is not writable.
    OutputDir = 31,

    /// The load generator (`hey`) is not installed or the given path does not exist.
    MissingTool = 32,

    /// Internal/runtime error (load generator failures, IO errors while recording).
    RuntimeError = 40,

    /// Aborted by SIGINT/Ctrl-C.
    Interrupted = 130,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
