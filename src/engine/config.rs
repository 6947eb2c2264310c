/// Rule engine tuning parameters
///
/// Flat configuration; every field has a default so partial JSON files work.
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hoop smoothing responsiveness (1.0 = follow raw detections)
    pub hoop_ema_alpha: f32,

    /// Hoop center jump that counts as a scene cut
    pub hoop_jump_reset_threshold: f32,

    /// Ball/hoop overlap counted as "at the rim"
    pub iou_threshold: f32,

    /// Zone extent above the hoop, in hoop heights
    pub hoop_zone_above_ratio: f32,

    /// Zone extent below the hoop, in hoop heights
    pub hoop_zone_below_ratio: f32,

    /// Horizontal zone tolerance, in hoop widths
    pub x_margin_ratio: f32,

    /// Max time from last-seen-outside to arrival
    pub shot_window_seconds: f64,

    /// Min displacement to count as arrival without a gap
    pub arrival_displacement: f32,

    /// Missing-frame streak confirming via disappearance
    pub disappear_frames: u32,

    /// Min time between confirmed makes
    pub cooldown_seconds: f64,

    /// Quiet period after a hard hoop reset
    pub hoop_reset_cooldown: f64,

    /// Re-entry within this window continues the previous visit
    pub inside_grace_period: f64,

    /// Candidate lifetime before auto-expiry
    pub confirm_window_seconds: f64,

    /// IoU confirming a pending candidate
    pub confirm_iou_threshold: f32,

    /// Vertical proximity to the rim confirming a candidate, in hoop heights
    pub confirm_rim_y_ratio: f32,

    /// Displacement cap for 0-1 frame gaps (rejects detector identity switches)
    pub max_short_gap_displacement: f32,

    /// Consecutive outside-zone frames invalidating a candidate
    pub candidate_outside_max: u32,

    /// Weight of hoop distance when picking the ball
    pub ball_distance_weight: f32,

    /// How long an above-the-hoop sighting stays usable for a descent arrival
    pub descent_window_seconds: f64,

    /// Min drop from the above-the-hoop sighting for a descent arrival
    pub descent_min_drop: f32,

    /// Min gap between two emitted events
    pub dedup_gap_seconds: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hoop_ema_alpha: 0.5,
            hoop_jump_reset_threshold: 0.30,
            iou_threshold: 0.08,
            hoop_zone_above_ratio: 0.30,
            hoop_zone_below_ratio: 1.20,
            x_margin_ratio: 0.20,
            shot_window_seconds: 8.0,
            arrival_displacement: 0.05,
            disappear_frames: 3,
            cooldown_seconds: 6.0,
            hoop_reset_cooldown: 2.5,
            inside_grace_period: 0.5,
            confirm_window_seconds: 2.0,
            confirm_iou_threshold: 0.05,
            confirm_rim_y_ratio: 1.5,
            max_short_gap_displacement: 0.20,
            candidate_outside_max: 3,
            ball_distance_weight: 0.8,
            descent_window_seconds: 1.5,
            descent_min_drop: 0.03,
            dedup_gap_seconds: 1.0,
        }
    }
}

impl EngineConfig {
    /// Reject values the engine cannot reason with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.hoop_ema_alpha > 0.0 && self.hoop_ema_alpha <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "hoop_ema_alpha must be in (0, 1], got {}",
                self.hoop_ema_alpha
            )));
        }

        let ratios = [
            ("hoop_jump_reset_threshold", self.hoop_jump_reset_threshold),
            ("iou_threshold", self.iou_threshold),
            ("hoop_zone_above_ratio", self.hoop_zone_above_ratio),
            ("hoop_zone_below_ratio", self.hoop_zone_below_ratio),
            ("x_margin_ratio", self.x_margin_ratio),
            ("arrival_displacement", self.arrival_displacement),
            ("confirm_iou_threshold", self.confirm_iou_threshold),
            ("confirm_rim_y_ratio", self.confirm_rim_y_ratio),
            ("max_short_gap_displacement", self.max_short_gap_displacement),
            ("ball_distance_weight", self.ball_distance_weight),
            ("descent_min_drop", self.descent_min_drop),
        ];
        for (name, value) in ratios {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!("{} must be a non-negative number, got {}", name, value)));
            }
        }

        let seconds = [
            ("cooldown_seconds", self.cooldown_seconds),
            ("hoop_reset_cooldown", self.hoop_reset_cooldown),
            ("inside_grace_period", self.inside_grace_period),
            ("dedup_gap_seconds", self.dedup_gap_seconds),
        ];
        for (name, value) in seconds {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!("{} must be a non-negative duration, got {}", name, value)));
            }
        }

        let windows = [
            ("shot_window_seconds", self.shot_window_seconds),
            ("confirm_window_seconds", self.confirm_window_seconds),
            ("descent_window_seconds", self.descent_window_seconds),
        ];
        for (name, value) in windows {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!("{} must be positive, got {}", name, value)));
            }
        }

        if self.disappear_frames == 0 {
            return Err(ConfigError::Invalid("disappear_frames must be at least 1".to_string()));
        }
        if self.candidate_outside_max == 0 {
            return Err(ConfigError::Invalid("candidate_outside_max must be at least 1".to_string()));
        }

        Ok(())
    }
}
