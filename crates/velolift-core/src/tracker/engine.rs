//! Rep tracker implementation.
//!
//! The tracker is a wall-clock-based state machine over signed bar velocity.
//! It owns no threads - the caller pushes one sample per tick and the tracker
//! reads the clock once per call (or takes the timestamp from the caller).
//!
//! ## State Transitions
//!
//! ```text
//! Squat / bench:  Resting -> Descending -> Ascending -> (reversal) -> Descending ...
//! Deadlift:       Resting -> Ascending -> Descending -> (rest) -> Resting
//! ```
//!
//! A rep is counted only when one attempt has seen both a descending and an
//! ascending phase, and at least `min_rep_interval_ms` has passed since the
//! previous rep.
//!
//! ## Usage
//!
//! ```ignore
//! let mut tracker = RepTracker::new(TrackerConfig::default());
//! // In a loop:
//! let frame = tracker.update(velocity);
//! if let Some(rep) = frame.completed { /* ... */ }
//! ```

use serde::{Deserialize, Serialize};

use super::stillness::StillnessWindow;
use super::thresholds::TrackerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepState {
    Resting,
    /// Bar going down (eccentric).
    Descending,
    /// Bar going up (concentric).
    Ascending,
}

/// Display phase of the lift, derived from tracker state and the raw sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiftPhase {
    Standing,
    Descending,
    Ascending,
}

/// Metrics of a rep counted during an `update` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedRep {
    pub rep_number: u32,
    /// Larger of the two phase peaks (m/s).
    pub peak_velocity: f64,
    /// Mean magnitude over the rep's moving samples (m/s).
    pub avg_velocity: f64,
    pub duration_secs: f64,
    pub peak_ascending: f64,
    pub peak_descending: f64,
}

/// Outcome of a single `update` call.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameResult {
    pub state: RepState,
    pub rep_count: u32,
    /// Present only on the call that counted a rep.
    pub completed: Option<CompletedRep>,
    /// True on the call where continuous rest first exceeded the set timeout.
    pub set_timed_out: bool,
    /// Live in-progress peak velocity, for display.
    pub current_peak: f64,
}

impl FrameResult {
    pub fn rep_just_completed(&self) -> bool {
        self.completed.is_some()
    }
}

/// Movement booleans derived from one sample.
#[derive(Debug, Clone, Copy)]
struct Motion {
    stationary: bool,
    moving: bool,
    going_up: bool,
    going_down: bool,
    at_rest: bool,
}

/// Everything that belongs to the current rep attempt.
///
/// Created when a phase is entered from rest and consumed whole when the rep
/// is finalized, so no field can survive into the next attempt.
#[derive(Debug, Clone, Default)]
struct Attempt {
    started_at_ms: u64,
    phase_started_at_ms: u64,
    descended: bool,
    ascended: bool,
    peak_ascending: f64,
    peak_descending: f64,
    samples: Vec<f64>,
    live_peak: f64,
}

impl Attempt {
    fn begin(phase: RepState, velocity: f64, at_ms: u64) -> Self {
        let mut attempt = Self {
            started_at_ms: at_ms,
            samples: vec![velocity],
            ..Self::default()
        };
        attempt.enter(phase, velocity.abs(), at_ms);
        attempt
    }

    fn enter(&mut self, phase: RepState, magnitude: f64, at_ms: u64) {
        self.phase_started_at_ms = at_ms;
        match phase {
            RepState::Descending => {
                self.descended = true;
                self.peak_descending = magnitude;
            }
            RepState::Ascending => {
                self.ascended = true;
                self.peak_ascending = magnitude;
            }
            RepState::Resting => {}
        }
    }

    fn record(&mut self, phase: RepState, velocity: f64) {
        let magnitude = velocity.abs();
        match phase {
            RepState::Descending => self.peak_descending = self.peak_descending.max(magnitude),
            RepState::Ascending => self.peak_ascending = self.peak_ascending.max(magnitude),
            RepState::Resting => {}
        }
        self.samples.push(velocity);
    }

    fn phase_elapsed_ms(&self, at_ms: u64) -> u64 {
        at_ms.saturating_sub(self.phase_started_at_ms)
    }

    fn has_both_phases(&self) -> bool {
        self.descended && self.ascended
    }

    /// Mean magnitude of samples above `rest_threshold`; idle tails are excluded.
    fn active_average(&self, rest_threshold: f64) -> f64 {
        let (sum, count) = self
            .samples
            .iter()
            .map(|v| v.abs())
            .filter(|m| *m > rest_threshold)
            .fold((0.0, 0usize), |(s, n), m| (s + m, n + 1));
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }
}

/// Direction-based rep counter over signed velocity.
#[derive(Debug, Clone)]
pub struct RepTracker {
    config: TrackerConfig,
    state: RepState,
    attempt: Attempt,
    rep_count: u32,
    /// One entry per counted rep.
    peak_history: Vec<f64>,
    last_rep_at_ms: Option<u64>,
    rest_started_at_ms: Option<u64>,
    /// Set timeout already signalled for the current rest period.
    timeout_reported: bool,
    /// Describes the sensor, not the set: survives both resets.
    stillness: StillnessWindow,
}

impl RepTracker {
    pub fn new(config: TrackerConfig) -> Self {
        let stillness = StillnessWindow::new(config.stationary_window);
        Self {
            config,
            state: RepState::Resting,
            attempt: Attempt::default(),
            rep_count: 0,
            peak_history: Vec::new(),
            last_rep_at_ms: None,
            rest_started_at_ms: None,
            timeout_reported: false,
            stillness,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> RepState {
        self.state
    }

    pub fn rep_count(&self) -> u32 {
        self.rep_count
    }

    pub fn peak_history(&self) -> &[f64] {
        &self.peak_history
    }

    pub fn current_peak(&self) -> f64 {
        self.attempt.live_peak
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Whether the stillness window currently classifies the sensor as still.
    pub fn is_stationary(&self) -> bool {
        self.stillness
            .is_stationary(self.config.stationary_std_dev)
    }

    /// Display phase for `velocity` given the current tracker state.
    pub fn lift_phase(&self, velocity: f64) -> LiftPhase {
        if self.state == RepState::Resting || velocity.abs() < self.config.rest_threshold {
            LiftPhase::Standing
        } else if velocity > 0.0 {
            LiftPhase::Ascending
        } else {
            LiftPhase::Descending
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Process one sample, reading the wall clock.
    pub fn update(&mut self, velocity: f64) -> FrameResult {
        self.update_at(velocity, now_ms())
    }

    /// Process one sample observed at `at_ms` (milliseconds since epoch).
    ///
    /// Never fails. NaN or infinite samples are the source's responsibility;
    /// they compare false everywhere and leave the state machine where it is.
    pub fn update_at(&mut self, velocity: f64, at_ms: u64) -> FrameResult {
        let motion = self.classify(velocity);
        let set_timed_out = self.track_rest(motion.at_rest, at_ms);
        let mut completed = None;

        match self.state {
            RepState::Resting => {
                if motion.going_down {
                    self.begin(RepState::Descending, velocity, at_ms);
                } else if motion.going_up {
                    self.begin(RepState::Ascending, velocity, at_ms);
                }
            }
            RepState::Descending => {
                self.attempt.record(RepState::Descending, velocity);
                if motion.going_up && self.phase_long_enough(at_ms) {
                    self.attempt
                        .enter(RepState::Ascending, velocity.abs(), at_ms);
                    self.state = RepState::Ascending;
                } else if motion.at_rest && self.attempt.ascended {
                    // Deadlift: up earlier in this attempt, now back down at rest.
                    completed = self.finalize(at_ms);
                }
            }
            RepState::Ascending => {
                self.attempt.record(RepState::Ascending, velocity);
                if motion.going_down && self.phase_long_enough(at_ms) {
                    if self.attempt.descended {
                        // Squat / bench: reversal at the top closes the rep and
                        // the new descent opens the next attempt.
                        completed = self.finalize(at_ms);
                        self.begin(RepState::Descending, velocity, at_ms);
                        self.clear_rest_timer();
                    } else {
                        // Deadlift: first descent after the pull, not a rep yet.
                        self.attempt
                            .enter(RepState::Descending, velocity.abs(), at_ms);
                        self.state = RepState::Descending;
                    }
                } else if motion.stationary && self.attempt.has_both_phases() {
                    // Lifter settled at the top for a whole stillness window.
                    completed = self.finalize(at_ms);
                }
                // Brief pauses at the top are ignored otherwise.
            }
        }

        if motion.moving {
            self.attempt.live_peak = self.attempt.live_peak.max(velocity.abs());
        }

        FrameResult {
            state: self.state,
            rep_count: self.rep_count,
            completed,
            set_timed_out,
            current_peak: self.attempt.live_peak,
        }
    }

    /// Session-continuation reset: drop the current attempt and rest timer,
    /// keep rep count, peak history and the debounce timestamp.
    pub fn reset(&mut self) {
        self.state = RepState::Resting;
        self.attempt = Attempt::default();
        self.clear_rest_timer();
    }

    /// Full reset for a new set: additionally zero rep count and history.
    /// The debounce timestamp is wall-clock state and survives.
    pub fn full_reset(&mut self) {
        self.reset();
        self.rep_count = 0;
        self.peak_history.clear();
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn classify(&mut self, velocity: f64) -> Motion {
        self.stillness.push(velocity);
        let stationary = self.is_stationary();
        let magnitude = velocity.abs();
        let threshold = self.config.movement_threshold;
        Motion {
            stationary,
            moving: magnitude > threshold && !stationary,
            going_up: velocity > threshold && !stationary,
            going_down: velocity < -threshold && !stationary,
            at_rest: magnitude < self.config.rest_threshold || stationary,
        }
    }

    /// Returns true on the call where rest first outlasts the set timeout.
    fn track_rest(&mut self, at_rest: bool, at_ms: u64) -> bool {
        if !at_rest {
            self.clear_rest_timer();
            return false;
        }
        let started = *self.rest_started_at_ms.get_or_insert(at_ms);
        if self.rep_count > 0
            && !self.timeout_reported
            && at_ms.saturating_sub(started) > self.config.set_timeout_ms
        {
            self.timeout_reported = true;
            return true;
        }
        false
    }

    fn clear_rest_timer(&mut self) {
        self.rest_started_at_ms = None;
        self.timeout_reported = false;
    }

    fn begin(&mut self, phase: RepState, velocity: f64, at_ms: u64) {
        self.attempt = Attempt::begin(phase, velocity, at_ms);
        self.state = phase;
    }

    fn phase_long_enough(&self, at_ms: u64) -> bool {
        self.attempt.phase_elapsed_ms(at_ms) >= self.config.min_phase_ms
    }

    /// Count the current attempt as a rep if it passes the gate.
    ///
    /// Rejections (missing phase, debounce) are silent: the attempt stays in
    /// place and the caller decides what happens next.
    fn finalize(&mut self, at_ms: u64) -> Option<CompletedRep> {
        if !self.attempt.has_both_phases() {
            return None;
        }
        if let Some(last) = self.last_rep_at_ms {
            let gap = at_ms.saturating_sub(last);
            if gap < self.config.min_rep_interval_ms {
                tracing::debug!(gap_ms = gap, "rep rejected by debounce");
                return None;
            }
        }

        let attempt = std::mem::take(&mut self.attempt);
        self.state = RepState::Resting;
        self.last_rep_at_ms = Some(at_ms);
        self.rep_count += 1;

        let peak = attempt.peak_ascending.max(attempt.peak_descending);
        self.peak_history.push(peak);

        Some(CompletedRep {
            rep_number: self.rep_count,
            peak_velocity: peak,
            avg_velocity: attempt.active_average(self.config.rest_threshold),
            duration_secs: at_ms.saturating_sub(attempt.started_at_ms) as f64 / 1000.0,
            peak_ascending: attempt.peak_ascending,
            peak_descending: attempt.peak_descending,
        })
    }
}

impl Default for RepTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}
