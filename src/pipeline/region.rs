/// Region of interest over a session
///
/// In `FollowHoop` mode the region starts from the user-drawn box, snaps
/// onto the first hoop detected inside it and then follows the engine's
/// smoothed hoop. When the hoop
/// has not been seen for `LOST_HOOP_FRAMES` frames the region falls back
/// to the user box so a moved hoop can be found again.
use serde::{Deserialize, Serialize};

use super::settings::PipelineSettings;
use crate::detection::{Detection, Label};
use crate::geometry::{derive_region_from_detections, derive_region_from_hoop, NormBox};

/// Hoop-less frames before the region widens back to the user box
pub const LOST_HOOP_FRAMES: u32 = 24;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionTracking {
    /// Use the configured region unchanged for the whole session
    #[default]
    Fixed,
    /// Snap onto the hoop inside the configured region, then follow it
    FollowHoop,
}

#[derive(Debug, Clone)]
pub struct RegionTracker {
    user_box: Option<NormBox>,
    tracking: RegionTracking,
    expand_factor: f32,
    active: Option<NormBox>,
    snapped: bool,
    frames_without_hoop: u32,
}

impl RegionTracker {
    pub fn new(settings: &PipelineSettings) -> Self {
        Self {
            user_box: settings.region,
            tracking: settings.region_tracking,
            expand_factor: settings.region_expand_factor,
            active: settings.region,
            snapped: false,
            frames_without_hoop: 0,
        }
    }

    /// Region handed to the detector for the next frame
    pub fn active(&self) -> Option<&NormBox> {
        self.active.as_ref()
    }

    /// Update from one frame's full-frame detections and the engine's hoop
    pub fn update(&mut self, detections: &[Detection], locked_hoop: Option<&NormBox>) {
        let Some(user_box) = self.user_box else {
            return;
        };
        if self.tracking == RegionTracking::Fixed {
            return;
        }

        if !detections.iter().any(|d| d.label == Label::Hoop) {
            self.frames_without_hoop += 1;
            if self.snapped && self.frames_without_hoop >= LOST_HOOP_FRAMES {
                tracing::info!(
                    "Hoop lost for {} frames, widening region back to {:?}",
                    self.frames_without_hoop,
                    user_box
                );
                self.snapped = false;
                self.active = Some(user_box);
            }
            return;
        }
        self.frames_without_hoop = 0;

        let next = match (self.snapped, locked_hoop) {
            (true, Some(hoop)) => derive_region_from_hoop(hoop, Some(self.expand_factor)),
            _ => {
                let region = derive_region_from_detections(detections, &user_box, Some(self.expand_factor));
                tracing::info!("Region snapped to hoop: {:?}", region);
                self.snapped = true;
                region
            }
        };
        self.active = Some(next);
    }
}
