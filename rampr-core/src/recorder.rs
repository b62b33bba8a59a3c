use crate::model::{RunContext, RunResult};

/// Persists run metrics as they are produced.
pub trait Recorder {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Called before the first wave of every escalation sequence.
    fn begin_sequence(&mut self, sequence: u32) -> Result<(), Self::Error>;

    fn record_run(
        &mut self,
        ctx: &RunContext,
        result: &RunResult,
        raw: Option<&str>,
    ) -> Result<(), Self::Error>;

    /// Flushes and closes whatever is still open. Also called after an interrupt.
    fn finish(&mut self) -> Result<(), Self::Error>;
}
