//! Error types
//!
//! The simulation never hands an `Err` across the frame boundary. Frame-level
//! problems become [`FrameError`] inside a skipped [`crate::sim::FrameOutcome`],
//! and balance tables supplied by the host are validated into [`TuningError`].

/// Reason a frame was skipped without advancing the simulation
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum FrameError {
    #[error("frame delta is not finite: {0}")]
    NonFiniteDt(f64),
    #[error("frame delta is negative: {0}")]
    NegativeDt(f64),
    #[error("player collision volume is degenerate")]
    DegenerateVolume,
}

/// Invalid balance table
#[derive(Debug, thiserror::Error)]
pub enum TuningError {
    #[error("tuning JSON could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("tuning value `{field}` out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}
