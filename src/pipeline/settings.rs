/// Orchestration settings: sampling rate, time window and region of interest
use serde::{Deserialize, Serialize};

use super::region::RegionTracking;
use crate::error::ConfigError;
use crate::geometry::{NormBox, DEFAULT_REGION_EXPAND};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Frames per second handed to the detector
    pub target_fps: f64,

    /// Seconds skipped at the start of the stream
    pub start_offset: f64,

    /// Seconds analysed after `start_offset`; `None` runs to the end
    pub max_duration: Option<f64>,

    /// Region of interest in frame-normalized coordinates
    pub region: Option<NormBox>,

    /// Whether `region` snaps onto the hoop found inside it
    pub region_tracking: RegionTracking,

    /// Expansion applied when deriving a region from a hoop box
    pub region_expand_factor: f32,

    /// Rate cap on constrained machines
    pub constrained_max_fps: f64,

    /// Hand a downscaled crop of the region to the progress callback
    pub emit_preview: bool,

    /// Longest side of the preview crop, in pixels
    pub preview_max_side: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            target_fps: 12.0,
            start_offset: 0.0,
            max_duration: None,
            region: None,
            region_tracking: RegionTracking::Fixed,
            region_expand_factor: DEFAULT_REGION_EXPAND,
            constrained_max_fps: 6.0,
            emit_preview: false,
            preview_max_side: 256,
        }
    }
}

impl PipelineSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.target_fps.is_finite() || self.target_fps <= 0.0 {
            return Err(ConfigError::Invalid(format!("target_fps must be positive, got {}", self.target_fps)));
        }
        if !self.constrained_max_fps.is_finite() || self.constrained_max_fps <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "constrained_max_fps must be positive, got {}",
                self.constrained_max_fps
            )));
        }
        if !self.start_offset.is_finite() || self.start_offset < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "start_offset must be a non-negative time, got {}",
                self.start_offset
            )));
        }
        if let Some(duration) = self.max_duration {
            if !duration.is_finite() || duration <= 0.0 {
                return Err(ConfigError::Invalid(format!("max_duration must be positive, got {}", duration)));
            }
        }
        if let Some(region) = self.region {
            let finite = [region.x, region.y, region.width, region.height].iter().all(|v| v.is_finite());
            if !finite || region.width <= 0.0 || region.height <= 0.0 {
                return Err(ConfigError::Invalid(format!("region must have a positive size, got {:?}", region)));
            }
        }
        if !self.region_expand_factor.is_finite() || self.region_expand_factor < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "region_expand_factor must be at least 1.0, got {}",
                self.region_expand_factor
            )));
        }
        if self.preview_max_side == 0 {
            return Err(ConfigError::Invalid("preview_max_side must be at least 1".to_string()));
        }
        Ok(())
    }
}
