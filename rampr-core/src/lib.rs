//! Load-escalation control loop.
//!
//! A session runs one or more escalation sequences. Each sequence drives waves of growing size
//! through a [`LoadGenerator`], aggregates repeated runs per wave into one error rate and stops
//! once that rate exceeds the threshold or the next wave would exceed the request cap.

mod aggregate;
mod controller;
mod error;
mod generator;
mod model;
mod recorder;
mod sizing;

pub use aggregate::{RunAggregator, WaveStep, aggregate_error_rate};
pub use controller::{
    ControllerConfig, ControllerState, SequenceOutcome, SessionOutcome, StopReason, run_sequence,
    run_session,
};
pub use error::{BoxError, Error, Result};
pub use generator::{LoadGenerator, LoadReport, LoadRequest, ResponseOutcomes, StatusTally};
pub use model::{
    Aggregation, RunContext, RunResult, SessionState, WaveOutcome, WaveSpec, is_success_status,
    round2,
};
pub use recorder::Recorder;
pub use sizing::{
    DEFAULT_CONCURRENCY_DIVISOR, DEFAULT_STAGES, DEFAULT_STAGE_STEP, PolicyKind, SizingPolicy,
    WavePolicy,
};
