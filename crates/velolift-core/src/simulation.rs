//! Deterministic synthetic velocity streams.
//!
//! Each phase of a rep is a half-sine velocity profile sampled at the tick
//! rate; rests are flat. Uniform noise and a constant sensor bias are added
//! on top. A fixed seed reproduces the same stream bit for bit.

use std::f64::consts::PI;
use std::str::FromStr;

use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::stream::SampleSource;

/// Lowering eccentric peaks are this fraction of the concentric peak.
const ECCENTRIC_RATIO: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiftPattern {
    /// Down first, then up (squat, bench).
    #[default]
    Squat,
    /// Up first, then down to the floor.
    Deadlift,
}

impl FromStr for LiftPattern {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "squat" | "bench" => Ok(LiftPattern::Squat),
            "deadlift" => Ok(LiftPattern::Deadlift),
            other => Err(ValidationError::InvalidValue {
                field: "pattern".into(),
                message: format!("expected 'squat' or 'deadlift', got '{other}'"),
            }),
        }
    }
}

/// Shape of a simulated set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub pattern: LiftPattern,
    pub reps: u32,
    /// Concentric peak of the first rep (m/s).
    pub peak_velocity: f64,
    /// Fraction of the first peak lost on every following rep.
    pub velocity_loss: f64,
    /// Duration of each movement phase.
    pub phase_ms: u64,
    /// Pause between reps.
    pub rest_ms: u64,
    /// Still time before the first rep and after the last.
    pub settle_ms: u64,
    pub tick_ms: u64,
    /// Uniform noise amplitude (m/s).
    pub noise: f64,
    /// Constant offset added to every sample (m/s).
    pub bias: f64,
    /// Random seed for reproducibility (None = random)
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            pattern: LiftPattern::Squat,
            reps: 5,
            peak_velocity: 0.8,
            velocity_loss: 0.0,
            phase_ms: 600,
            rest_ms: 300,
            settle_ms: 1_500,
            tick_ms: 20,
            noise: 0.005,
            bias: 0.0,
            seed: Some(42),
        }
    }
}

impl SimulationConfig {
    /// Concentric peak planned for each rep, before noise.
    pub fn planned_peaks(&self) -> Vec<f64> {
        (0..self.reps)
            .map(|i| (self.peak_velocity * (1.0 - self.velocity_loss * f64::from(i))).max(0.0))
            .collect()
    }

    /// Reject values the generator cannot sample from.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [
            ("peak_velocity", self.peak_velocity),
            ("velocity_loss", self.velocity_loss),
            ("noise", self.noise),
            ("bias", self.bias),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(ValidationError::InvalidValue {
                    field: field.into(),
                    message: format!("must be a finite number, got {value}"),
                });
            }
        }
        if self.noise < 0.0 {
            return Err(ValidationError::InvalidValue {
                field: "noise".into(),
                message: "must not be negative".into(),
            });
        }
        Ok(())
    }

    fn ticks(&self, ms: u64) -> usize {
        (ms / self.tick_ms.max(1)) as usize
    }
}

/// Generates velocity samples for a [`SimulationConfig`].
#[derive(Debug, Clone)]
pub struct VelocitySimulator {
    config: SimulationConfig,
    rng: Mcg128Xsl64,
}

impl VelocitySimulator {
    pub fn new(config: SimulationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        Self { config, rng }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Produce the whole set: settle, reps separated by rests, settle.
    pub fn generate(&mut self) -> Vec<f64> {
        let cfg = self.config.clone();
        let phase = cfg.ticks(cfg.phase_ms).max(1);
        let mut clean = vec![0.0; cfg.ticks(cfg.settle_ms)];

        for (i, peak) in cfg.planned_peaks().into_iter().enumerate() {
            if i > 0 {
                clean.extend(std::iter::repeat(0.0).take(cfg.ticks(cfg.rest_ms)));
            }
            let eccentric = -peak * ECCENTRIC_RATIO;
            match cfg.pattern {
                LiftPattern::Squat => {
                    clean.extend(half_sine(eccentric, phase));
                    clean.extend(half_sine(peak, phase));
                }
                LiftPattern::Deadlift => {
                    clean.extend(half_sine(peak, phase));
                    clean.extend(half_sine(eccentric, phase));
                }
            }
        }
        clean.extend(std::iter::repeat(0.0).take(cfg.ticks(cfg.settle_ms)));

        clean
            .into_iter()
            .map(|v| v + cfg.bias + self.jitter(cfg.noise))
            .collect()
    }

    fn jitter(&mut self, amplitude: f64) -> f64 {
        if amplitude > 0.0 {
            self.rng.gen_range(-amplitude..=amplitude)
        } else {
            0.0
        }
    }
}

fn half_sine(peak: f64, samples: usize) -> impl Iterator<Item = f64> {
    (0..samples).map(move |k| peak * (PI * (k as f64 + 0.5) / samples as f64).sin())
}

/// A simulated set exposed as a [`SampleSource`].
#[derive(Debug, Clone)]
pub struct SimulatedSource {
    samples: std::vec::IntoIter<f64>,
}

impl SimulatedSource {
    pub fn new(config: SimulationConfig) -> Self {
        let samples = VelocitySimulator::new(config).generate();
        Self {
            samples: samples.into_iter(),
        }
    }
}

impl SampleSource for SimulatedSource {
    fn next_velocity(&mut self) -> Option<f64> {
        self.samples.next()
    }
}
