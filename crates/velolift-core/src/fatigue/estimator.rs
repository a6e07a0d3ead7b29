//! Velocity-loss fatigue estimation.
//!
//! Two signals against a self-calibrating baseline:
//! - **Per frame**: a continuous fatigue index from the mean of recent
//!   concentric (ascending) samples. It may flicker and never latches.
//! - **Per rep**: the authoritative check. The first `baseline_reps` rep peaks
//!   set the baseline; afterwards a smoothed peak that has dropped by at least
//!   `threshold` raises one warning per session.
//!
//! The 11% default and the 3-rep warm-up come from velocity-based training
//! practice and are configuration, not constants.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::tracker::{positive, LiftPhase};

/// Fatigue estimator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FatigueConfig {
    /// Fractional velocity drop that counts as fatigue (0.11 = 11%).
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Completed reps averaged into the baseline.
    #[serde(default = "default_baseline_reps")]
    pub baseline_reps: usize,
    /// Trailing rep peaks averaged before comparing with the baseline.
    #[serde(default = "default_smoothing_window")]
    pub smoothing_window: usize,
    /// Capacity of the per-frame concentric buffer.
    #[serde(default = "default_frame_window")]
    pub frame_window: usize,
}

fn default_threshold() -> f64 {
    0.11
}
fn default_baseline_reps() -> usize {
    3
}
fn default_smoothing_window() -> usize {
    3
}
fn default_frame_window() -> usize {
    50
}

impl Default for FatigueConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            baseline_reps: default_baseline_reps(),
            smoothing_window: default_smoothing_window(),
            frame_window: default_frame_window(),
        }
    }
}

impl FatigueConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending `fatigue.*` key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("fatigue.threshold", self.threshold)?;
        for (key, value) in [
            ("fatigue.baseline_reps", self.baseline_reps),
            ("fatigue.smoothing_window", self.smoothing_window),
            ("fatigue.frame_window", self.frame_window),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: "must be at least 1".into(),
                });
            }
        }
        Ok(())
    }
}

/// Live per-frame fatigue reading.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameFatigue {
    /// 0.0 (fresh) ..= 1.0 (drop at or beyond threshold).
    pub index: f64,
    pub alert: bool,
}

/// One-shot warning raised when the smoothed rep peak falls below baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FatigueWarning {
    /// Smoothed peak velocity that triggered the warning (m/s).
    pub current_velocity: f64,
    pub baseline_velocity: f64,
    pub drop_percentage: f64,
    pub rep_number: u32,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct FatigueEstimator {
    config: FatigueConfig,
    baseline: Option<f64>,
    /// Append-only peak per completed rep.
    rep_peaks: Vec<f64>,
    /// Concentric samples since the last completed rep.
    frame_buffer: VecDeque<f64>,
    fatigue_detected_at: Option<u32>,
}

impl FatigueEstimator {
    pub fn new(config: FatigueConfig) -> Self {
        let frame_buffer = VecDeque::with_capacity(config.frame_window);
        Self {
            config,
            baseline: None,
            rep_peaks: Vec::new(),
            frame_buffer,
            fatigue_detected_at: None,
        }
    }

    pub fn baseline(&self) -> Option<f64> {
        self.baseline
    }

    pub fn fatigue_detected_at(&self) -> Option<u32> {
        self.fatigue_detected_at
    }

    /// Peak velocity per completed rep, for charting.
    pub fn velocity_trend(&self) -> &[f64] {
        &self.rep_peaks
    }

    pub fn config(&self) -> &FatigueConfig {
        &self.config
    }

    /// Per-frame update, called with the sample magnitude on every tick.
    pub fn per_frame(&mut self, magnitude: f64, phase: LiftPhase) -> FrameFatigue {
        if phase == LiftPhase::Ascending {
            if self.frame_buffer.len() >= self.config.frame_window.max(1) {
                self.frame_buffer.pop_front();
            }
            self.frame_buffer.push_back(magnitude);
        }

        let Some(baseline) = self.usable_baseline() else {
            return FrameFatigue::default();
        };
        if self.frame_buffer.is_empty() {
            return FrameFatigue::default();
        }

        let recent = self.frame_buffer.iter().sum::<f64>() / self.frame_buffer.len() as f64;
        let drop = (baseline - recent) / baseline;
        FrameFatigue {
            index: (drop / self.config.threshold).clamp(0.0, 1.0),
            alert: drop >= self.config.threshold,
        }
    }

    /// Per-rep check, called once for every completed rep.
    pub fn per_rep(&mut self, peak_velocity: f64, rep_number: u32) -> Option<FatigueWarning> {
        self.rep_peaks.push(peak_velocity);
        self.frame_buffer.clear();

        if self.rep_peaks.len() == self.config.baseline_reps && self.baseline.is_none() {
            let baseline = mean(&self.rep_peaks);
            self.baseline = Some(baseline);
            tracing::info!("baseline velocity established: {baseline:.3} m/s");
            return None;
        }

        let baseline = self.usable_baseline()?;
        let smoothed = self.smoothed_peak(peak_velocity);
        let drop = (baseline - smoothed) / baseline;

        if drop >= self.config.threshold && self.fatigue_detected_at.is_none() {
            self.fatigue_detected_at = Some(rep_number);
            let drop_percentage = drop * 100.0;
            tracing::info!(rep_number, drop_percentage, "fatigue detected");
            return Some(FatigueWarning {
                current_velocity: smoothed,
                baseline_velocity: baseline,
                drop_percentage,
                rep_number,
                message: format!(
                    "Velocity dropped {drop_percentage:.1}% from baseline. Consider ending set."
                ),
            });
        }
        None
    }

    /// Current smoothed drop from baseline as a fraction, floored at zero.
    pub fn current_drop(&self) -> f64 {
        let Some(baseline) = self.usable_baseline() else {
            return 0.0;
        };
        let Some(last) = self.rep_peaks.last() else {
            return 0.0;
        };
        let smoothed = self.smoothed_peak(*last);
        ((baseline - smoothed) / baseline).max(0.0)
    }

    /// Clear baseline, history, frame buffer and the fatigue latch.
    pub fn reset(&mut self) {
        self.baseline = None;
        self.rep_peaks.clear();
        self.frame_buffer.clear();
        self.fatigue_detected_at = None;
    }

    fn usable_baseline(&self) -> Option<f64> {
        self.baseline.filter(|b| *b != 0.0)
    }

    fn smoothed_peak(&self, latest: f64) -> f64 {
        let window = self.config.smoothing_window;
        if window > 0 && self.rep_peaks.len() >= window {
            mean(&self.rep_peaks[self.rep_peaks.len() - window..])
        } else {
            latest
        }
    }
}

impl Default for FatigueEstimator {
    fn default() -> Self {
        Self::new(FatigueConfig::default())
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calibrated(peak: f64) -> FatigueEstimator {
        let mut estimator = FatigueEstimator::default();
        for rep in 1..=3 {
            assert!(estimator.per_rep(peak, rep).is_none());
        }
        estimator
    }

    #[test]
    fn baseline_set_on_calibration_rep_without_warning() {
        let mut estimator = FatigueEstimator::default();
        assert!(estimator.per_rep(0.9, 1).is_none());
        assert!(estimator.per_rep(0.8, 2).is_none());
        assert_eq!(estimator.baseline(), None);
        assert!(estimator.per_rep(0.4, 3).is_none());
        assert!((estimator.baseline().unwrap() - 0.7).abs() < 1e-9);
    }

    #[test]
    fn baseline_is_computed_once() {
        let mut estimator = calibrated(1.0);
        estimator.per_rep(0.99, 4);
        estimator.per_rep(0.98, 5);
        assert_eq!(estimator.baseline(), Some(1.0));
    }

    #[test]
    fn smoothed_drop_raises_single_warning() {
        let mut estimator = calibrated(1.0);
        // Smoothed over the last three: (1.0 + 1.0 + 0.55) / 3 = 0.85.
        let warning = estimator.per_rep(0.55, 4).expect("warning");
        assert_eq!(warning.rep_number, 4);
        assert!((warning.current_velocity - 0.85).abs() < 1e-9);
        assert!((warning.drop_percentage - 15.0).abs() < 1e-6);
        assert!(warning.message.contains("15.0%"));
        assert_eq!(estimator.fatigue_detected_at(), Some(4));

        assert!(estimator.per_rep(0.3, 5).is_none());
        assert!(estimator.per_rep(0.1, 6).is_none());
        assert_eq!(estimator.fatigue_detected_at(), Some(4));
    }

    #[test]
    fn reset_rearms_warning() {
        let mut estimator = calibrated(1.0);
        assert!(estimator.per_rep(0.55, 4).is_some());
        estimator.reset();
        assert_eq!(estimator.baseline(), None);
        assert!(estimator.velocity_trend().is_empty());

        for rep in 1..=3 {
            estimator.per_rep(1.0, rep);
        }
        assert!(estimator.per_rep(0.55, 4).is_some());
    }

    #[test]
    fn zero_baseline_short_circuits() {
        let mut estimator = calibrated(0.0);
        assert_eq!(estimator.baseline(), Some(0.0));
        assert!(estimator.per_rep(0.0, 4).is_none());
        let frame = estimator.per_frame(0.5, LiftPhase::Ascending);
        assert_eq!(frame, FrameFatigue::default());
        assert_eq!(estimator.current_drop(), 0.0);
    }

    #[test]
    fn per_frame_is_silent_before_baseline() {
        let mut estimator = FatigueEstimator::default();
        let frame = estimator.per_frame(0.2, LiftPhase::Ascending);
        assert_eq!(frame.index, 0.0);
        assert!(!frame.alert);
    }

    #[test]
    fn per_frame_index_tracks_concentric_average() {
        let mut estimator = calibrated(1.0);
        // Non-concentric samples are ignored.
        let frame = estimator.per_frame(0.1, LiftPhase::Descending);
        assert_eq!(frame, FrameFatigue::default());

        let frame = estimator.per_frame(0.945, LiftPhase::Ascending);
        assert!((frame.index - 0.5).abs() < 1e-6);
        assert!(!frame.alert);

        let frame = estimator.per_frame(0.6, LiftPhase::Ascending);
        assert_eq!(frame.index, 1.0);
        assert!(frame.alert);
    }

    #[test]
    fn per_frame_flickers_without_latching() {
        let mut estimator = calibrated(1.0);
        assert!(estimator.per_frame(0.5, LiftPhase::Ascending).alert);
        estimator.per_rep(1.0, 4);
        let frame = estimator.per_frame(1.0, LiftPhase::Ascending);
        assert!(!frame.alert);
        assert_eq!(frame.index, 0.0);
        assert_eq!(estimator.fatigue_detected_at(), None);
    }

    #[test]
    fn frame_buffer_is_bounded() {
        let config = FatigueConfig {
            frame_window: 2,
            ..FatigueConfig::default()
        };
        let mut estimator = FatigueEstimator::new(config);
        for rep in 1..=3 {
            estimator.per_rep(1.0, rep);
        }
        estimator.per_frame(0.0, LiftPhase::Ascending);
        estimator.per_frame(1.0, LiftPhase::Ascending);
        // Oldest sample (0.0) evicted: mean of [1.0, 1.0].
        let frame = estimator.per_frame(1.0, LiftPhase::Ascending);
        assert_eq!(frame.index, 0.0);
    }

    #[test]
    fn current_drop_uses_smoothed_peaks() {
        let mut estimator = calibrated(1.0);
        estimator.per_rep(0.7, 4);
        assert!((estimator.current_drop() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn zero_windows_rejected_by_validation() {
        let cfg = FatigueConfig {
            baseline_reps: 0,
            ..FatigueConfig::default()
        };
        assert!(cfg.validate().is_err());
        assert!(FatigueConfig::default().validate().is_ok());
    }
}
