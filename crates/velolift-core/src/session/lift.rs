//! Per-sample orchestration of tracker and fatigue estimator.
//!
//! One `LiftSession` owns everything a single athlete stream needs. Each
//! sample runs the tracker, derives the display phase, feeds the per-frame
//! fatigue index, and, when a rep completes, the per-rep fatigue check.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::command::SessionCommand;
use super::workout::{CompletedSet, SetConfig, Workout, WorkoutInfo};
use crate::events::{timestamp, Event};
use crate::fatigue::{FatigueConfig, FatigueEstimator};
use crate::tracker::{now_ms, RepTracker, TrackerConfig};

/// Snapshot of the set in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total_reps: u32,
    pub max_velocity: f64,
    pub avg_velocity: f64,
    pub fatigue_detected_at_rep: Option<u32>,
    /// Peak velocity of every rep, in order.
    pub velocity_trend: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct LiftSession {
    tracker: RepTracker,
    fatigue: FatigueEstimator,
    /// Used for archived sets when no set was started explicitly.
    default_set: SetConfig,
    active_set: Option<SetConfig>,
    workout: Option<Workout>,
    standalone_sets: Vec<CompletedSet>,
}

impl LiftSession {
    pub fn new(tracker: TrackerConfig, fatigue: FatigueConfig) -> Self {
        Self {
            tracker: RepTracker::new(tracker),
            fatigue: FatigueEstimator::new(fatigue),
            default_set: SetConfig::default(),
            active_set: None,
            workout: None,
            standalone_sets: Vec::new(),
        }
    }

    pub fn with_default_set(mut self, set: SetConfig) -> Self {
        self.default_set = set;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn tracker(&self) -> &RepTracker {
        &self.tracker
    }

    pub fn fatigue(&self) -> &FatigueEstimator {
        &self.fatigue
    }

    /// Set started with `start_set`, if any.
    pub fn set_config(&self) -> Option<&SetConfig> {
        self.active_set.as_ref()
    }

    pub fn active_workout(&self) -> Option<WorkoutInfo> {
        self.workout.as_ref().map(Workout::info)
    }

    /// Sets archived while no workout was open.
    pub fn standalone_sets(&self) -> &[CompletedSet] {
        &self.standalone_sets
    }

    pub fn summary(&self) -> SessionSummary {
        let peaks = self.tracker.peak_history();
        let (max_velocity, avg_velocity) = if peaks.is_empty() {
            (0.0, 0.0)
        } else {
            (
                peaks.iter().copied().fold(f64::MIN, f64::max),
                peaks.iter().sum::<f64>() / peaks.len() as f64,
            )
        };
        SessionSummary {
            total_reps: self.tracker.rep_count(),
            max_velocity,
            avg_velocity,
            fatigue_detected_at_rep: self.fatigue.fatigue_detected_at(),
            velocity_trend: peaks.to_vec(),
        }
    }

    // ── Samples ──────────────────────────────────────────────────────

    /// Process one sample, reading the wall clock.
    pub fn process(&mut self, velocity: f64) -> Vec<Event> {
        self.process_at(velocity, now_ms())
    }

    /// Process one sample observed at `at_ms`; returns the events it produced,
    /// always starting with a `Frame`.
    pub fn process_at(&mut self, velocity: f64, at_ms: u64) -> Vec<Event> {
        let at = timestamp(at_ms);
        let frame = self.tracker.update_at(velocity, at_ms);
        let phase = self.tracker.lift_phase(velocity);
        let live = self.fatigue.per_frame(velocity.abs(), phase);

        let mut events = vec![Event::Frame {
            state: frame.state,
            phase,
            velocity,
            rep_count: frame.rep_count,
            current_peak: frame.current_peak,
            fatigue_index: live.index,
            fatigue_alert: live.alert,
            at,
        }];

        if let Some(rep) = frame.completed {
            let warning = self.fatigue.per_rep(rep.peak_velocity, rep.rep_number);
            events.push(Event::RepCompleted { rep, at });
            if let Some(warning) = warning {
                events.push(Event::FatigueWarning { warning, at });
            }
        }

        if frame.set_timed_out {
            let summary = self.summary();
            tracing::info!(reps = summary.total_reps, "set auto-ended after rest timeout");
            self.reset();
            events.push(Event::SetAutoEnded { summary, at });
        }

        events
    }

    /// Run a recorded stream with synthetic timestamps `tick_ms` apart.
    pub fn replay(&mut self, samples: &[f64], start_at_ms: u64, tick_ms: u64) -> Vec<Event> {
        samples
            .iter()
            .enumerate()
            .flat_map(|(i, v)| self.process_at(*v, start_at_ms + i as u64 * tick_ms))
            .collect()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// End the current set: archive it if any reps were counted, then clear
    /// tracker and estimator.
    pub fn reset(&mut self) {
        if self.tracker.rep_count() > 0 {
            self.archive_set();
        }
        self.tracker.full_reset();
        self.fatigue.reset();
    }

    /// Drop the attempt in progress without ending the set.
    pub fn abandon_rep(&mut self) {
        self.tracker.reset();
    }

    /// Forget the fatigue baseline; rep counting is untouched.
    pub fn recalibrate(&mut self) {
        self.fatigue.reset();
        tracing::info!("fatigue baseline cleared");
    }

    pub fn start_set(&mut self, config: SetConfig) {
        self.reset();
        tracing::info!(exercise = %config.exercise, weight = config.weight, "set started");
        self.active_set = Some(config);
    }

    /// Open a new workout. A workout that was still open is closed first and
    /// handed back alongside the new one's info.
    pub fn start_workout(
        &mut self,
        name: &str,
        date: Option<NaiveDate>,
    ) -> (WorkoutInfo, Option<Workout>) {
        let closed = self.end_workout();
        let workout = Workout::new(name, date);
        tracing::info!(id = %workout.id, name = %workout.name, "workout started");
        let info = workout.info();
        self.workout = Some(workout);
        (info, closed)
    }

    /// Close the open workout and hand it back for persistence.
    pub fn end_workout(&mut self) -> Option<Workout> {
        let mut workout = self.workout.take()?;
        workout.ended_at = Some(Utc::now());
        tracing::info!(
            id = %workout.id,
            sets = workout.sets.len(),
            duration_secs = workout.duration_secs(),
            "workout ended"
        );
        Some(workout)
    }

    /// Apply a client command and return the events to publish.
    pub fn handle(&mut self, command: SessionCommand) -> Vec<Event> {
        let at = Utc::now();
        let name = command.name();
        let ack = Event::Ack {
            command: name.into(),
            at,
        };
        match command {
            SessionCommand::Reset => {
                self.reset();
                vec![ack]
            }
            SessionCommand::Recalibrate => {
                self.recalibrate();
                vec![ack]
            }
            SessionCommand::AbandonRep => {
                self.abandon_rep();
                vec![ack]
            }
            SessionCommand::GetSummary => vec![Event::Summary {
                summary: self.summary(),
                at,
            }],
            SessionCommand::StartSet {
                exercise,
                weight,
                unit,
            } => {
                let config = SetConfig::sanitized(
                    exercise.as_ref().and_then(|v| v.as_str()),
                    weight.as_ref().and_then(|v| v.as_f64()),
                    unit.as_ref().and_then(|v| v.as_str()),
                );
                self.start_set(config.clone());
                vec![
                    Event::SetConfig {
                        config: Some(config),
                        at,
                    },
                    ack,
                ]
            }
            SessionCommand::GetSet => vec![Event::SetConfig {
                config: self.active_set.clone(),
                at,
            }],
            SessionCommand::StartWorkout { name, date } => {
                let (workout, closed) = self.start_workout(name.as_deref().unwrap_or(""), date);
                let mut events: Vec<Event> = closed.iter().map(|w| workout_ended(w, at)).collect();
                events.push(Event::WorkoutStarted { workout, at });
                events.push(ack);
                events
            }
            SessionCommand::EndWorkout => {
                let mut events: Vec<Event> =
                    self.end_workout().iter().map(|w| workout_ended(w, at)).collect();
                events.push(ack);
                events
            }
            SessionCommand::GetWorkout => vec![Event::ActiveWorkout {
                workout: self.active_workout(),
                at,
            }],
        }
    }

    fn archive_set(&mut self) {
        let config = self.active_set.as_ref().unwrap_or(&self.default_set);
        let set = CompletedSet::from_summary(config, &self.summary());
        tracing::info!(
            exercise = %set.exercise,
            reps = set.reps,
            in_workout = self.workout.is_some(),
            "set archived"
        );
        match self.workout.as_mut() {
            Some(workout) => workout.sets.push(set),
            None => self.standalone_sets.push(set),
        }
    }
}

fn workout_ended(workout: &Workout, at: DateTime<Utc>) -> Event {
    Event::WorkoutEnded {
        duration_secs: workout.duration_secs(),
        workout: workout.info(),
        at,
    }
}

impl Default for LiftSession {
    fn default() -> Self {
        Self::new(TrackerConfig::default(), FatigueConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(parts: &[(f64, usize)]) -> Vec<f64> {
        parts
            .iter()
            .flat_map(|(v, n)| std::iter::repeat(*v).take(*n))
            .collect()
    }

    /// One deadlift rep: up, down, settle.
    fn deadlift() -> Vec<f64> {
        run(&[(0.5, 10), (-0.4, 10), (0.0, 30)])
    }

    fn kinds(events: &[Event]) -> Vec<&'static str> {
        events
            .iter()
            .filter(|e| !e.is_frame())
            .map(Event::kind)
            .collect()
    }

    #[test]
    fn every_sample_yields_a_frame_first() {
        let mut session = LiftSession::default();
        let events = session.process_at(0.3, 0);
        assert_eq!(events.len(), 1);
        assert!(events[0].is_frame());
    }

    #[test]
    fn rep_completion_emits_rep_event() {
        let mut session = LiftSession::default();
        let events = session.replay(&deadlift(), 0, 20);
        assert_eq!(kinds(&events), vec!["rep_completed"]);
        assert_eq!(session.summary().total_reps, 1);
        assert_eq!(session.summary().velocity_trend, vec![0.5]);
    }

    #[test]
    fn summary_reports_max_and_mean() {
        let mut session = LiftSession::default();
        let mut samples = deadlift();
        samples.extend(run(&[(0.3, 10), (-0.2, 10), (0.0, 30)]));
        session.replay(&samples, 0, 20);

        let summary = session.summary();
        assert_eq!(summary.total_reps, 2);
        assert!((summary.max_velocity - 0.5).abs() < 1e-9);
        assert!((summary.avg_velocity - 0.4).abs() < 1e-9);
        assert_eq!(summary.fatigue_detected_at_rep, None);
    }

    #[test]
    fn rest_timeout_auto_ends_and_archives_set() {
        let mut session = LiftSession::default();
        let mut samples = deadlift();
        samples.extend(run(&[(0.0, 300)]));
        let events = session.replay(&samples, 0, 20);

        assert_eq!(kinds(&events), vec!["rep_completed", "set_auto_ended"]);
        let summary = events
            .iter()
            .find_map(|e| match e {
                Event::SetAutoEnded { summary, .. } => Some(summary),
                _ => None,
            })
            .expect("auto-end event");
        assert_eq!(summary.total_reps, 1);
        assert_eq!(session.summary().total_reps, 0);
        assert_eq!(session.standalone_sets().len(), 1);
        assert_eq!(session.standalone_sets()[0].exercise, "Squat");
    }

    #[test]
    fn reset_without_reps_archives_nothing() {
        let mut session = LiftSession::default();
        session.reset();
        assert!(session.standalone_sets().is_empty());
    }

    #[test]
    fn sets_land_in_open_workout() {
        let mut session = LiftSession::default();
        let (info, closed) = session.start_workout("Leg day", None);
        assert_eq!(info.name, "Leg day");
        assert!(closed.is_none());

        session.replay(&deadlift(), 0, 20);
        session.start_set(SetConfig::sanitized(Some("Deadlift"), Some(315.0), None));
        assert_eq!(session.active_workout().unwrap().set_count, 1);
        assert!(session.standalone_sets().is_empty());

        let workout = session.end_workout().unwrap();
        assert_eq!(workout.sets.len(), 1);
        assert!(workout.ended_at.is_some());
        assert!(session.active_workout().is_none());
        assert!(session.end_workout().is_none());
    }

    #[test]
    fn archived_set_uses_started_config() {
        let mut session = LiftSession::default();
        session.start_set(SetConfig::sanitized(Some("Bench"), Some(100.0), Some("kg")));
        session.replay(&deadlift(), 0, 20);
        session.reset();
        let set = &session.standalone_sets()[0];
        assert_eq!(set.exercise, "Bench");
        assert_eq!(set.weight, 100.0);
    }

    #[test]
    fn recalibrate_keeps_rep_count() {
        let mut session = LiftSession::default();
        session.replay(&deadlift(), 0, 20);
        session.recalibrate();
        assert_eq!(session.summary().total_reps, 1);
        assert_eq!(session.summary().velocity_trend, vec![0.5]);
        assert!(session.fatigue().velocity_trend().is_empty());
    }

    #[test]
    fn velocity_trend_covers_reps_across_recalibrate() {
        let mut session = LiftSession::default();
        session.replay(&deadlift(), 0, 20);
        session.recalibrate();
        session.replay(&deadlift(), 2_000, 20);

        let summary = session.summary();
        assert_eq!(summary.total_reps, 2);
        assert_eq!(summary.velocity_trend.len(), summary.total_reps as usize);

        session.reset();
        let set = &session.standalone_sets()[0];
        assert_eq!(set.reps, 2);
        assert_eq!(set.peak_velocities, vec![0.5, 0.5]);
    }

    #[test]
    fn starting_a_workout_hands_back_the_open_one() {
        let mut session = LiftSession::default();
        session.start_workout("Monday", None);
        session.replay(&deadlift(), 0, 20);
        session.reset();

        let (info, closed) = session.start_workout("Tuesday", None);
        let closed = closed.expect("open workout is closed");
        assert_eq!(closed.name, "Monday");
        assert_eq!(closed.sets.len(), 1);
        assert!(closed.ended_at.is_some());
        assert_eq!(info.set_count, 0);

        let events = session.handle(SessionCommand::StartWorkout {
            name: Some("Wednesday".into()),
            date: None,
        });
        assert_eq!(kinds(&events), vec!["workout_ended", "workout_started", "ack"]);
        let Event::WorkoutEnded { workout, .. } = &events[0] else {
            panic!("expected workout_ended first");
        };
        assert_eq!(workout.name, "Tuesday");
    }

    #[test]
    fn handle_start_set_sanitizes_and_acks() {
        let mut session = LiftSession::default();
        let command =
            SessionCommand::parse(r#"{"command":"start_set","exercise":"Row","weight":"heavy"}"#)
                .unwrap();
        let events = session.handle(command);
        assert_eq!(kinds(&events), vec!["set_config", "ack"]);
        let config = session.set_config().unwrap();
        assert_eq!(config.exercise, "Row");
        assert_eq!(config.weight, 0.0);
    }

    #[test]
    fn handle_workout_lifecycle() {
        let mut session = LiftSession::default();
        let events = session.handle(SessionCommand::GetWorkout);
        assert!(matches!(events[0], Event::ActiveWorkout { workout: None, .. }));

        let events = session.handle(SessionCommand::StartWorkout {
            name: Some("Push".into()),
            date: None,
        });
        assert_eq!(kinds(&events), vec!["workout_started", "ack"]);

        let events = session.handle(SessionCommand::EndWorkout);
        assert_eq!(kinds(&events), vec!["workout_ended", "ack"]);

        let events = session.handle(SessionCommand::EndWorkout);
        assert_eq!(kinds(&events), vec!["ack"]);
    }

    #[test]
    fn abandon_rep_discards_attempt_only() {
        let mut session = LiftSession::default();
        session.replay(&deadlift(), 0, 20);
        session.replay(&run(&[(0.5, 5)]), 2_000, 20);
        session.handle(SessionCommand::AbandonRep);
        assert_eq!(session.tracker().current_peak(), 0.0);
        assert_eq!(session.summary().total_reps, 1);
    }
}
