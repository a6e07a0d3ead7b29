//! Lifting session: the per-athlete pipeline plus set and workout bookkeeping.

mod command;
mod lift;
mod workout;

pub use command::{SessionCommand, COMMANDS};
pub use lift::{LiftSession, SessionSummary};
pub use workout::{CompletedSet, SetConfig, WeightUnit, Workout, WorkoutInfo};
