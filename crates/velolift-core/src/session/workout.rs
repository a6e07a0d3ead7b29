//! Set and workout records kept by a lifting session.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::lift::SessionSummary;
use crate::error::ValidationError;

const DEFAULT_EXERCISE: &str = "Squat";
const MAX_EXERCISE_LEN: usize = 100;
const MAX_WEIGHT: f64 = 2000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Lbs,
    Kg,
}

impl FromStr for WeightUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lbs" => Ok(WeightUnit::Lbs),
            "kg" => Ok(WeightUnit::Kg),
            other => Err(ValidationError::InvalidValue {
                field: "unit".into(),
                message: format!("expected 'lbs' or 'kg', got '{other}'"),
            }),
        }
    }
}

/// Exercise and load of the set being performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetConfig {
    #[serde(default = "default_exercise")]
    pub exercise: String,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub unit: WeightUnit,
}

fn default_exercise() -> String {
    DEFAULT_EXERCISE.into()
}

impl Default for SetConfig {
    fn default() -> Self {
        Self {
            exercise: default_exercise(),
            weight: 0.0,
            unit: WeightUnit::Lbs,
        }
    }
}

impl SetConfig {
    /// Build a set config from untrusted client input.
    ///
    /// Anything out of range falls back to the default rather than failing:
    /// an over-long or blank exercise becomes "Squat", a weight outside
    /// 0..=2000 becomes 0, an unknown unit becomes lbs.
    pub fn sanitized(exercise: Option<&str>, weight: Option<f64>, unit: Option<&str>) -> Self {
        let exercise = exercise
            .map(str::trim)
            .filter(|e| !e.is_empty() && e.chars().count() <= MAX_EXERCISE_LEN)
            .map(str::to_string)
            .unwrap_or_else(default_exercise);
        let weight = weight
            .filter(|w| w.is_finite() && (0.0..=MAX_WEIGHT).contains(w))
            .unwrap_or(0.0);
        let unit = unit
            .and_then(|u| u.parse::<WeightUnit>().ok())
            .unwrap_or_default();
        Self {
            exercise,
            weight,
            unit,
        }
    }
}

/// A finished set as archived into a workout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedSet {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub exercise: String,
    pub weight: f64,
    pub unit: WeightUnit,
    pub reps: u32,
    pub avg_velocity: f64,
    pub max_velocity: f64,
    pub peak_velocities: Vec<f64>,
    pub fatigue_detected_at_rep: Option<u32>,
}

impl CompletedSet {
    pub fn from_summary(config: &SetConfig, summary: &SessionSummary) -> Self {
        Self {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            exercise: config.exercise.clone(),
            weight: config.weight,
            unit: config.unit,
            reps: summary.total_reps,
            avg_velocity: summary.avg_velocity,
            max_velocity: summary.max_velocity,
            peak_velocities: summary.velocity_trend.clone(),
            fatigue_detected_at_rep: summary.fatigue_detected_at_rep,
        }
    }
}

/// A training session grouping several sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub id: Uuid,
    pub name: String,
    pub date: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sets: Vec<CompletedSet>,
    #[serde(default)]
    pub notes: String,
}

/// Lightweight view of a workout for clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutInfo {
    pub id: Uuid,
    pub name: String,
    pub date: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub set_count: usize,
}

impl Workout {
    pub fn new(name: &str, date: Option<NaiveDate>) -> Self {
        let name = name.trim();
        Self {
            id: Uuid::new_v4(),
            name: if name.is_empty() { "Workout".into() } else { name.into() },
            date: date.unwrap_or_else(|| chrono::Local::now().date_naive()),
            started_at: Utc::now(),
            ended_at: None,
            sets: Vec::new(),
            notes: String::new(),
        }
    }

    pub fn info(&self) -> WorkoutInfo {
        WorkoutInfo {
            id: self.id,
            name: self.name.clone(),
            date: self.date,
            started_at: self.started_at,
            set_count: self.sets.len(),
        }
    }

    /// Wall-clock length; zero while the workout is still open.
    pub fn duration_secs(&self) -> f64 {
        self.ended_at
            .map(|end| (end - self.started_at).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0)
    }
}
