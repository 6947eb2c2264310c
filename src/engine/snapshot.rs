use serde::Serialize;

use super::candidate::{ArrivalPattern, Candidate};
use crate::geometry::{NormBox, RimLine};

/// Read-only view of the engine after the last consumed frame
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DebugSnapshot {
    pub frame_index: u64,
    pub timestamp: f64,
    /// Smoothed hoop box
    pub hoop: Option<NormBox>,
    /// Ball selected this frame
    pub ball: Option<NormBox>,
    pub rim_line: Option<RimLine>,
    pub hoop_locked: bool,
    pub ball_in_zone: bool,
    /// Larger of the make cooldown and the hoop-reset cooldown
    pub cooldown_remaining: f64,
    pub make_count: usize,
    /// How the last make was confirmed ("iou", "rim", "below-hoop", "disappear")
    pub last_trigger_reason: Option<String>,
    /// Arrival pattern of the candidate behind the last make
    pub last_arrival: Option<ArrivalPattern>,
    pub candidate: Option<Candidate>,
}
