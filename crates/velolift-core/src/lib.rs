//! # Velolift Core Library
//!
//! This library provides the core logic for velocity-based strength training:
//! counting reps from a stream of signed bar velocity and flagging fatigue
//! from the loss of rep velocity over a set. The CLI binary is a thin layer
//! over the same library.
//!
//! ## Architecture
//!
//! - **Rep Tracker**: A wall-clock-based state machine that requires the caller
//!   to push one velocity sample per tick
//! - **Fatigue Estimator**: Self-calibrating velocity-loss detector with a
//!   per-frame index and a one-shot per-rep warning
//! - **Session**: Per-athlete pipeline composing both, plus set and workout
//!   bookkeeping and command dispatch
//! - **Stream**: Latest-value boundary between a sensor reader thread and an
//!   async consumer loop
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`RepTracker`]: Rep counting state machine
//! - [`FatigueEstimator`]: Velocity-loss fatigue detection
//! - [`LiftSession`]: Sample-to-event pipeline
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod fatigue;
pub mod session;
pub mod simulation;
pub mod storage;
pub mod stream;
pub mod tracker;

pub use error::{ConfigError, CoreError, ValidationError};
pub use events::Event;
pub use fatigue::{FatigueConfig, FatigueEstimator, FatigueWarning, FrameFatigue};
pub use session::{LiftSession, SessionCommand, SessionSummary, SetConfig, WeightUnit, Workout};
pub use simulation::{LiftPattern, SimulatedSource, SimulationConfig, VelocitySimulator};
pub use storage::Config;
pub use stream::{LatestSample, ReplaySource, SampleSource, StreamConfig, StreamPump};
pub use tracker::{
    now_ms, CompletedRep, FrameResult, LiftPhase, RepState, RepTracker, TrackerConfig,
};
