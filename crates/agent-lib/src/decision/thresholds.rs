//! Rule thresholds and learned overrides

use serde::{Deserialize, Serialize};

/// Learned CPU thresholds only replace defaults once this many samples exist
pub const MIN_LEARNED_SAMPLES: usize = 5;

/// Bounds a learned scale-up threshold may move within
pub const SCALE_UP_CPU_BOUNDS: (f64, f64) = (50.0, 95.0);

/// Bounds a learned scale-down threshold may move within
pub const SCALE_DOWN_CPU_BOUNDS: (f64, f64) = (5.0, 50.0);

/// Trigger values used by the analyzers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub cpu_scale_up: f64,
    pub cpu_scale_down: f64,
    pub memory_scale_up: f64,
    pub memory_scale_down: f64,
    pub disk_usage: f64,
    /// Seconds
    pub response_time: f64,
    /// Percent
    pub error_rate: f64,
    pub network_usage: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu_scale_up: 80.0,
            cpu_scale_down: 30.0,
            memory_scale_up: 85.0,
            memory_scale_down: 40.0,
            disk_usage: 90.0,
            response_time: 2.0,
            error_rate: 5.0,
            network_usage: 80.0,
        }
    }
}

/// Threshold knowledge handed from the learning module to the engine at
/// the start of a cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnedAdjustments {
    /// Mean CPU at which scale-up proved effective, with sample count
    pub scale_up_cpu: Option<(f64, usize)>,
    /// Mean CPU at which scale-down proved effective, with sample count
    pub scale_down_cpu: Option<(f64, usize)>,
}

impl Thresholds {
    /// Defaults with any sufficiently supported learned values applied
    pub fn with_adjustments(adjustments: &LearnedAdjustments) -> Self {
        let mut thresholds = Self::default();

        if let Some(value) = learned_value(adjustments.scale_up_cpu, SCALE_UP_CPU_BOUNDS) {
            thresholds.cpu_scale_up = value;
        }
        if let Some(value) = learned_value(adjustments.scale_down_cpu, SCALE_DOWN_CPU_BOUNDS) {
            thresholds.cpu_scale_down = value;
        }

        // keep the hysteresis band open
        if thresholds.cpu_scale_down >= thresholds.cpu_scale_up {
            thresholds.cpu_scale_down = Self::default().cpu_scale_down;
            thresholds.cpu_scale_up = Self::default().cpu_scale_up;
        }

        thresholds
    }
}

fn learned_value(learned: Option<(f64, usize)>, (min, max): (f64, f64)) -> Option<f64> {
    match learned {
        Some((value, samples)) if samples >= MIN_LEARNED_SAMPLES && value.is_finite() => {
            Some(value.clamp(min, max))
        }
        _ => None,
    }
}
