use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fatigue::FatigueWarning;
use crate::session::{SessionSummary, SetConfig, WorkoutInfo};
use crate::tracker::{CompletedRep, LiftPhase, RepState};

/// Everything the session produces for the event sink.
/// Transport (broadcast, persistence) is the sink's business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Per-tick status, emitted for every processed sample.
    Frame {
        state: RepState,
        phase: LiftPhase,
        /// Signed sample, m/s.
        velocity: f64,
        rep_count: u32,
        current_peak: f64,
        fatigue_index: f64,
        fatigue_alert: bool,
        at: DateTime<Utc>,
    },
    RepCompleted {
        rep: CompletedRep,
        at: DateTime<Utc>,
    },
    FatigueWarning {
        warning: FatigueWarning,
        at: DateTime<Utc>,
    },
    /// Continuous rest outlasted the set timeout; the set has been archived.
    SetAutoEnded {
        summary: SessionSummary,
        at: DateTime<Utc>,
    },
    Summary {
        summary: SessionSummary,
        at: DateTime<Utc>,
    },
    SetConfig {
        config: Option<SetConfig>,
        at: DateTime<Utc>,
    },
    WorkoutStarted {
        workout: WorkoutInfo,
        at: DateTime<Utc>,
    },
    WorkoutEnded {
        workout: WorkoutInfo,
        duration_secs: f64,
        at: DateTime<Utc>,
    },
    ActiveWorkout {
        workout: Option<WorkoutInfo>,
        at: DateTime<Utc>,
    },
    /// Acknowledges a session command with no payload of its own.
    Ack {
        command: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Wire name of the variant, as written in the `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Frame { .. } => "frame",
            Event::RepCompleted { .. } => "rep_completed",
            Event::FatigueWarning { .. } => "fatigue_warning",
            Event::SetAutoEnded { .. } => "set_auto_ended",
            Event::Summary { .. } => "summary",
            Event::SetConfig { .. } => "set_config",
            Event::WorkoutStarted { .. } => "workout_started",
            Event::WorkoutEnded { .. } => "workout_ended",
            Event::ActiveWorkout { .. } => "active_workout",
            Event::Ack { .. } => "ack",
        }
    }

    pub fn is_frame(&self) -> bool {
        matches!(self, Event::Frame { .. })
    }
}

/// Epoch milliseconds to a UTC timestamp, falling back to now when out of range.
pub(crate) fn timestamp(at_ms: u64) -> DateTime<Utc> {
    i64::try_from(at_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_else(Utc::now)
}
