mod engine;
mod stillness;
mod thresholds;

pub use engine::{now_ms, CompletedRep, FrameResult, LiftPhase, RepState, RepTracker};
pub use stillness::StillnessWindow;
pub use thresholds::TrackerConfig;

pub(crate) use thresholds::positive;
