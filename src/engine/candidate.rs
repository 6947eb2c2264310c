/// Shot candidate lifecycle
///
/// A candidate is a provisional "the ball just arrived at the hoop"
/// hypothesis. At most one exists at a time:
///
/// ```text
/// Idle ──open──> Pending ──confirm────> Idle (make emitted)
///                   ├──── expire ─────> Idle
///                   ├──── invalidate ─> Idle
///                   └──── discard ────> Idle (hoop reset)
/// ```
use serde::Serialize;

/// Which arrival heuristic opened the candidate
///
/// Evaluated in declaration order; the first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArrivalPattern {
    /// Ball reappeared in the zone after a gap of 2+ frames with real displacement
    PatternA,
    /// Ball moved into the zone with real displacement
    PatternB,
    /// Ball overlaps the hoop
    PatternC,
    /// Ball dropped into the zone from above the hoop
    PatternD,
}

impl ArrivalPattern {
    pub fn tag(&self) -> &'static str {
        match self {
            ArrivalPattern::PatternA => "PatternA",
            ArrivalPattern::PatternB => "PatternB",
            ArrivalPattern::PatternC => "PatternC",
            ArrivalPattern::PatternD => "PatternD",
        }
    }
}

/// How a pending candidate was upgraded into a make
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmPath {
    /// Ball overlaps the hoop enough
    Iou,
    /// Ball center is close to the rim line
    Rim,
    /// Ball fell through and reappeared under the net
    BelowHoop,
    /// Ball vanished behind the net for several frames
    Disappear,
}

impl ConfirmPath {
    pub fn tag(&self) -> &'static str {
        match self {
            ConfirmPath::Iou => "iou",
            ConfirmPath::Rim => "rim",
            ConfirmPath::BelowHoop => "below-hoop",
            ConfirmPath::Disappear => "disappear",
        }
    }
}

/// Why a pending candidate was dropped without a make
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    Expired,
    Invalidated,
    HoopReset,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub opened_at: f64,
    pub pattern: ArrivalPattern,
    pub expires_at: f64,
    pub seen_in_zone: bool,
    pub missing_streak: u32,
    pub outside_streak: u32,
}

impl Candidate {
    pub fn reason_tag(&self) -> &'static str {
        self.pattern.tag()
    }

    pub fn is_expired(&self, now: f64) -> bool {
        now > self.expires_at
    }
}

/// Candidate state machine
#[derive(Debug, Clone, Default)]
pub struct CandidateTracker {
    pending: Option<Candidate>,
}

impl CandidateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<&Candidate> {
        self.pending.as_ref()
    }

    pub fn pending_mut(&mut self) -> Option<&mut Candidate> {
        self.pending.as_mut()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Idle -> Pending; the ball is in the zone when a candidate opens
    pub fn open(&mut self, pattern: ArrivalPattern, now: f64, confirm_window: f64) -> &Candidate {
        self.pending.insert(Candidate {
            opened_at: now,
            pattern,
            expires_at: now + confirm_window,
            seen_in_zone: true,
            missing_streak: 0,
            outside_streak: 0,
        })
    }

    /// Pending -> Idle, handing back the confirmed candidate
    pub fn confirm(&mut self) -> Option<Candidate> {
        self.pending.take()
    }

    /// Pending -> Idle without a make
    pub fn drop_pending(&mut self, reason: DropReason) -> Option<(Candidate, DropReason)> {
        self.pending.take().map(|c| (c, reason))
    }

    /// Drop the candidate when its confirm window has passed
    pub fn expire_if_due(&mut self, now: f64) -> Option<Candidate> {
        if self.pending.as_ref().is_some_and(|c| c.is_expired(now)) {
            self.pending.take()
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}
