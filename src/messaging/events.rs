/// Diagnostic event types for the rule engine
///
/// Events represent things that have happened (past tense) inside one
/// engine session. They are published to the session's diagnostic sink.
use serde::Serialize;

use crate::engine::candidate::{ArrivalPattern, ConfirmPath, DropReason};
use crate::engine::hoop_track::HoopUpdate;
use crate::geometry::NormBox;

/// Coarse branch the engine took for a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameBranch {
    /// No hoop has been observed yet
    NoHoop,
    BallAbsent,
    InZone,
    OutsideZone,
}

/// One frame's reasoning trail
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameTrace {
    pub frame_index: u64,
    pub timestamp: f64,
    pub hoop_update: Option<HoopUpdate>,
    pub hoop: Option<NormBox>,
    pub ball: Option<NormBox>,
    pub branch: FrameBranch,
    pub ball_iou: f32,
    pub gap_frames: u32,
    pub cooldown_remaining: f64,
}

/// Engine diagnostic events
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Session state was cleared
    SessionReset,

    /// A frame was consumed
    Frame(FrameTrace),

    /// Hoop center jumped; treated as a scene cut
    HoopReset { time: f64, jump: f32 },

    /// An arrival pattern opened a candidate
    CandidateOpened {
        time: f64,
        pattern: ArrivalPattern,
        expires_at: f64,
        displacement: Option<f32>,
        gap_frames: u32,
    },

    /// A candidate was discarded without a make
    CandidateDropped {
        time: f64,
        pattern: ArrivalPattern,
        reason: DropReason,
    },

    /// A make was confirmed and appended to the event log
    MakeConfirmed {
        time: f64,
        pattern: ArrivalPattern,
        via: ConfirmPath,
        make_count: usize,
    },

    /// A confirmation landed too close to the previous make
    MakeSuppressed { time: f64, previous: f64 },
}

impl EngineEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            EngineEvent::SessionReset => "Session reset".to_string(),
            EngineEvent::Frame(trace) => {
                format!("Frame {} @ {:.3}s: {:?}", trace.frame_index, trace.timestamp, trace.branch)
            }
            EngineEvent::HoopReset { time, jump } => {
                format!("Hoop reset @ {:.3}s (jump {:.3})", time, jump)
            }
            EngineEvent::CandidateOpened { time, pattern, .. } => {
                format!("Candidate opened @ {:.3}s by {}", time, pattern.tag())
            }
            EngineEvent::CandidateDropped { time, reason, .. } => {
                format!("Candidate dropped @ {:.3}s: {:?}", time, reason)
            }
            EngineEvent::MakeConfirmed { time, pattern, via, make_count } => {
                format!(
                    "Make #{} @ {:.3}s ({} via {})",
                    make_count,
                    time,
                    pattern.tag(),
                    via.tag()
                )
            }
            EngineEvent::MakeSuppressed { time, previous } => {
                format!("Make @ {:.3}s suppressed (previous @ {:.3}s)", time, previous)
            }
        }
    }

    /// Frame traces are high-volume; everything else is a lifecycle change
    pub fn is_frame_trace(&self) -> bool {
        matches!(self, EngineEvent::Frame(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_description() {
        let event = EngineEvent::MakeConfirmed {
            time: 4.25,
            pattern: ArrivalPattern::PatternA,
            via: ConfirmPath::Iou,
            make_count: 1,
        };
        assert_eq!(event.description(), "Make #1 @ 4.250s (PatternA via iou)");
        assert!(!event.is_frame_trace());
    }

    #[test]
    fn test_event_json_is_tagged() {
        let event = EngineEvent::HoopReset { time: 2.0, jump: 0.5 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "hoop_reset");
        assert_eq!(json["time"], 2.0);
    }
}
