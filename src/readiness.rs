//! Daily readiness score.
//!
//! Six self-reported values are folded into a single 0-100 score. Every
//! 1-5 input uses the same orientation (higher is better) once stress and
//! soreness are flipped, and sleep duration is bucketed onto the 1-5 scale.

use serde::{Deserialize, Serialize};

const WEIGHT_SLEEP_QUALITY: f64 = 0.25;
const WEIGHT_SLEEP_HOURS: f64 = 0.15;
const WEIGHT_ENERGY: f64 = 0.2;
const WEIGHT_STRESS: f64 = 0.15;
const WEIGHT_SORENESS: f64 = 0.15;
const WEIGHT_MOTIVATION: f64 = 0.1;

/// Value used for a missing 1-5 answer.
const NEUTRAL: i32 = 3;
/// Bucket used when sleep hours are not reported at all.
const UNREPORTED_SLEEP_HOURS_SCORE: f64 = 3.0;
const SCALE_MIN: i32 = 1;
const SCALE_MAX: i32 = 5;

pub const MAX_SLEEP_HOURS: f64 = 24.0;

/// Number of most recent check-ins inspected for a low-readiness alert.
pub const LOW_READINESS_WINDOW: usize = 3;
pub const LOW_READINESS_THRESHOLD: f64 = 50.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadinessInput {
    pub sleep_quality: Option<i32>,
    pub sleep_hours: Option<f64>,
    pub energy_level: Option<i32>,
    pub stress_level: Option<i32>,
    pub muscle_soreness: Option<i32>,
    pub motivation: Option<i32>,
}

impl ReadinessInput {
    /// Check every provided answer against its documented range.
    pub fn validate(&self) -> Result<(), String> {
        let scaled = [
            ("sleepQuality", self.sleep_quality),
            ("energyLevel", self.energy_level),
            ("stressLevel", self.stress_level),
            ("muscleSoreness", self.muscle_soreness),
            ("motivation", self.motivation),
        ];

        for (field, value) in scaled {
            if let Some(v) = value {
                if !(SCALE_MIN..=SCALE_MAX).contains(&v) {
                    return Err(format!(
                        "{} must be between {} and {}",
                        field, SCALE_MIN, SCALE_MAX
                    ));
                }
            }
        }

        if let Some(hours) = self.sleep_hours {
            if !hours.is_finite() || !(0.0..=MAX_SLEEP_HOURS).contains(&hours) {
                return Err(format!("sleepHours must be between 0 and {}", MAX_SLEEP_HOURS));
            }
        }

        Ok(())
    }
}

/// Bucket hours of sleep onto the 1-5 scale. 7-9h is optimal; short nights
/// are penalized harder than long ones.
pub fn sleep_hours_score(hours: f64) -> f64 {
    if hours < 4.0 {
        1.0
    } else if hours < 5.0 {
        2.0
    } else if hours < 6.0 {
        3.0
    } else if hours < 7.0 {
        4.0
    } else if hours <= 9.0 {
        5.0
    } else if hours <= 10.0 {
        4.0
    } else {
        3.0
    }
}

/// Flip a lower-is-better 1-5 answer so that 1 becomes 5.
fn inverted(value: i32) -> f64 {
    f64::from(SCALE_MAX + SCALE_MIN - value)
}

fn answer(value: Option<i32>) -> f64 {
    f64::from(value.unwrap_or(NEUTRAL))
}

/// Compute the readiness score, rounded to one decimal and clamped to [0, 100].
pub fn calculate_score(input: &ReadinessInput) -> f64 {
    let sleep_hours = input
        .sleep_hours
        .map(sleep_hours_score)
        .unwrap_or(UNREPORTED_SLEEP_HOURS_SCORE);

    let weighted = answer(input.sleep_quality) * WEIGHT_SLEEP_QUALITY
        + sleep_hours * WEIGHT_SLEEP_HOURS
        + answer(input.energy_level) * WEIGHT_ENERGY
        + inverted(input.stress_level.unwrap_or(NEUTRAL)) * WEIGHT_STRESS
        + inverted(input.muscle_soreness.unwrap_or(NEUTRAL)) * WEIGHT_SORENESS
        + answer(input.motivation) * WEIGHT_MOTIVATION;

    let score = weighted / f64::from(SCALE_MAX) * 100.0;
    ((score * 10.0).round() / 10.0).clamp(0.0, 100.0)
}

/// Mean of the latest scores when a full window is available and the mean
/// falls below the alert threshold.
pub fn low_readiness_average(recent: &[f64]) -> Option<f64> {
    if recent.len() < LOW_READINESS_WINDOW {
        return None;
    }
    let window = &recent[..LOW_READINESS_WINDOW];
    let mean = window.iter().sum::<f64>() / window.len() as f64;
    (mean < LOW_READINESS_THRESHOLD).then_some(mean)
}
