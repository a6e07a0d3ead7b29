mod estimator;

pub use estimator::{FatigueConfig, FatigueEstimator, FatigueWarning, FrameFatigue};
