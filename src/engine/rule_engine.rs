/// Shot rule engine
///
/// Turns one frame of ball/hoop detections at a time into made-basket
/// events. Owns all session state: the smoothed hoop, the single pending
/// candidate, the arrival bookkeeping and the event log.
///
/// Per frame:
/// 1. expire a stale candidate
/// 2. smooth (or hard-reset) the hoop track
/// 3. pick the ball that best trades confidence against hoop distance
/// 4. classify the ball against the zone around the hoop
/// 5. open, confirm, invalidate or keep the candidate
///
/// The engine never fails; missing detections simply mean "no event".
/// It is not synchronized: feed it from a single consumer in timestamp order.
use super::candidate::{ArrivalPattern, CandidateTracker, ConfirmPath, DropReason};
use super::config::EngineConfig;
use super::event::MakeEvent;
use super::hoop_track::{HoopTrack, HoopUpdate};
use super::snapshot::DebugSnapshot;
use crate::detection::{best_ball_near, best_by_confidence, Detection, Label};
use crate::geometry::{NormBox, RimLine};
use crate::messaging::{DiagnosticSink, EngineEvent, FrameBranch, FrameTrace, TracingSink};
use crate::utils::Cooldown;

/// Ball center observed at a given time
#[derive(Debug, Clone, Copy, PartialEq)]
struct Sighting {
    time: f64,
    x: f32,
    y: f32,
}

impl Sighting {
    fn of(ball: &NormBox, time: f64) -> Self {
        let (x, y) = ball.center();
        Self { time, x, y }
    }

    fn distance_to(&self, x: f32, y: f32) -> f32 {
        ((self.x - x).powi(2) + (self.y - y).powi(2)).sqrt()
    }
}

/// Arrival match with the numbers that justified it
#[derive(Debug, Clone, Copy)]
struct Arrival {
    pattern: ArrivalPattern,
    displacement: Option<f32>,
}

pub struct ShotRuleEngine {
    config: EngineConfig,
    hoop: HoopTrack,
    candidates: CandidateTracker,
    make_cooldown: Cooldown,

    last_outside: Option<Sighting>,
    last_above_hoop: Option<Sighting>,
    last_inside_time: Option<f64>,
    /// Consecutive ball-less frames before the current one
    gap_frames: u32,

    frame_index: u64,
    last_timestamp: Option<f64>,
    events: Vec<MakeEvent>,
    last_trigger_reason: Option<String>,
    last_arrival: Option<ArrivalPattern>,
    snapshot: DebugSnapshot,
    sink: Box<dyn DiagnosticSink>,
}

impl ShotRuleEngine {
    /// Create an engine that reports diagnostics through `tracing`
    pub fn new(config: EngineConfig) -> Self {
        Self::with_sink(config, Box::new(TracingSink))
    }

    pub fn with_sink(config: EngineConfig, sink: Box<dyn DiagnosticSink>) -> Self {
        let make_cooldown = Cooldown::new(config.cooldown_seconds);
        Self {
            config,
            hoop: HoopTrack::new(),
            candidates: CandidateTracker::new(),
            make_cooldown,
            last_outside: None,
            last_above_hoop: None,
            last_inside_time: None,
            gap_frames: 0,
            frame_index: 0,
            last_timestamp: None,
            events: Vec::new(),
            last_trigger_reason: None,
            last_arrival: None,
            snapshot: DebugSnapshot::default(),
            sink,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the tuning parameters; takes effect on the next frame
    pub fn set_config(&mut self, config: EngineConfig) {
        self.make_cooldown = Cooldown::new(config.cooldown_seconds);
        if let Some(last) = self.events.last() {
            self.make_cooldown.trigger(last.time);
        }
        self.config = config;
    }

    /// Swap the diagnostic sink, flushing the old one
    pub fn set_sink(&mut self, sink: Box<dyn DiagnosticSink>) -> Box<dyn DiagnosticSink> {
        self.sink.flush();
        std::mem::replace(&mut self.sink, sink)
    }

    pub fn flush_diagnostics(&mut self) {
        self.sink.flush();
    }

    /// Clear all session state and the event log
    pub fn reset(&mut self) {
        self.hoop.clear();
        self.candidates.clear();
        self.make_cooldown.reset();
        self.last_outside = None;
        self.last_above_hoop = None;
        self.last_inside_time = None;
        self.gap_frames = 0;
        self.frame_index = 0;
        self.last_timestamp = None;
        self.events.clear();
        self.last_trigger_reason = None;
        self.last_arrival = None;
        self.snapshot = DebugSnapshot::default();
        self.sink.publish(&EngineEvent::SessionReset);
    }

    /// Accumulated, time-ordered make log for this session
    pub fn detected_makes(&self) -> &[MakeEvent] {
        &self.events
    }

    pub fn debug_snapshot(&self) -> &DebugSnapshot {
        &self.snapshot
    }

    pub fn make_count(&self) -> usize {
        self.events.len()
    }

    /// Smoothed hoop box, once a hoop has been seen
    pub fn hoop_box(&self) -> Option<NormBox> {
        self.hoop.smoothed().copied()
    }

    /// Consume one frame's detections; returns the make confirmed on this frame, if any
    pub fn consume_frame(&mut self, timestamp: f64, detections: &[Detection]) -> Option<MakeEvent> {
        if let Some(previous) = self.last_timestamp {
            if timestamp < previous {
                tracing::warn!(
                    "Frame timestamp went backwards ({:.3}s after {:.3}s)",
                    timestamp,
                    previous
                );
            }
        }
        self.last_timestamp = Some(timestamp);

        // 1. Expire
        if let Some(expired) = self.candidates.expire_if_due(timestamp) {
            self.sink.publish(&EngineEvent::CandidateDropped {
                time: timestamp,
                pattern: expired.pattern,
                reason: DropReason::Expired,
            });
        }

        // 2. Hoop
        let hoop_update = best_by_confidence(detections, Label::Hoop).map(|d| {
            self.hoop.observe(
                d.bbox,
                timestamp,
                self.config.hoop_ema_alpha,
                self.config.hoop_jump_reset_threshold,
            )
        });
        if let Some(HoopUpdate::Reset { jump }) = hoop_update {
            self.sink.publish(&EngineEvent::HoopReset { time: timestamp, jump });
            // A scene cut invalidates in-flight reasoning and the sightings behind it
            self.drop_candidate(timestamp, DropReason::HoopReset);
            self.last_outside = None;
            self.last_above_hoop = None;
        }

        // 3. Nothing to reason about until a hoop has been seen
        let Some(hoop) = self.hoop.smoothed().copied() else {
            if detections.iter().any(|d| d.label == Label::Ball) {
                self.gap_frames = 0;
            } else {
                self.gap_frames += 1;
            }
            self.finish_frame(timestamp, hoop_update, None, FrameBranch::NoHoop, 0.0, false);
            return None;
        };

        // 4. Ball
        let ball = best_ball_near(detections, &hoop, self.config.ball_distance_weight).map(|d| d.bbox);

        // Both cooldowns gate candidate formation and confirmation
        let gates_clear = self.cooldown_remaining(timestamp) <= 0.0;

        let (branch, iou, made) = match ball {
            Some(ball) => {
                let iou = ball.iou(&hoop);
                let gap_frames = self.gap_frames;
                let outcome = if self.in_zone(&ball, &hoop, iou) {
                    let made = self.on_ball_in_zone(timestamp, &ball, &hoop, iou, gap_frames, gates_clear);
                    (FrameBranch::InZone, iou, made)
                } else {
                    let made = self.on_ball_outside(timestamp, &ball, &hoop, gates_clear);
                    (FrameBranch::OutsideZone, iou, made)
                };

                let sighting = Sighting::of(&ball, timestamp);
                if sighting.y < hoop.y {
                    self.last_above_hoop = Some(sighting);
                }
                self.gap_frames = 0;
                outcome
            }
            None => {
                let made = self.on_ball_absent(timestamp, gates_clear);
                (FrameBranch::BallAbsent, 0.0, made)
            }
        };

        let in_zone = branch == FrameBranch::InZone;
        self.finish_frame(timestamp, hoop_update, ball, branch, iou, in_zone);
        made
    }

    /// Remaining time of whichever cooldown (make or hoop reset) runs longer
    fn cooldown_remaining(&self, now: f64) -> f64 {
        let reset_remaining = self
            .hoop
            .last_reset_time()
            .map(|t| (self.config.hoop_reset_cooldown - (now - t)).max(0.0))
            .unwrap_or(0.0);
        self.make_cooldown.remaining(now).max(reset_remaining)
    }

    /// Rectangle around the hoop where a ball counts as "at the hoop"
    fn zone(&self, hoop: &NormBox) -> NormBox {
        let (cx, _) = hoop.center();
        let half_width = hoop.width * (0.5 + self.config.x_margin_ratio);
        let top = hoop.y - self.config.hoop_zone_above_ratio * hoop.height;
        let bottom = hoop.max_y() + self.config.hoop_zone_below_ratio * hoop.height;
        NormBox::new(cx - half_width, top, half_width * 2.0, bottom - top)
    }

    fn in_zone(&self, ball: &NormBox, hoop: &NormBox, iou: f32) -> bool {
        let (bx, by) = ball.center();
        self.zone(hoop).contains_point(bx, by) || iou > self.config.iou_threshold
    }

    /// Ball dropped out under the net: below the hoop and horizontally close
    fn is_below_hoop(&self, ball: &NormBox, hoop: &NormBox) -> bool {
        let (bx, by) = ball.center();
        let (hx, _) = hoop.center();
        let half_width = hoop.width * (0.5 + self.config.x_margin_ratio);
        by > hoop.max_y() && (bx - hx).abs() <= half_width
    }

    fn rim_confirmation(&self, ball: &NormBox, hoop: &NormBox, iou: f32) -> Option<ConfirmPath> {
        if iou >= self.config.confirm_iou_threshold {
            return Some(ConfirmPath::Iou);
        }
        let (_, by) = ball.center();
        let rim = RimLine::from_hoop(hoop);
        if (by - rim.y).abs() <= self.config.confirm_rim_y_ratio * hoop.height {
            return Some(ConfirmPath::Rim);
        }
        None
    }

    fn on_ball_in_zone(
        &mut self,
        now: f64,
        ball: &NormBox,
        hoop: &NormBox,
        iou: f32,
        gap_frames: u32,
        gates_clear: bool,
    ) -> Option<MakeEvent> {
        let mut made = None;

        if let Some(candidate) = self.candidates.pending_mut() {
            candidate.seen_in_zone = true;
            candidate.outside_streak = 0;
            candidate.missing_streak = 0;

            if gates_clear {
                if let Some(via) = self.rim_confirmation(ball, hoop, iou) {
                    made = self.confirm(now, via);
                }
            }
        } else if self.is_fresh_arrival(now) && gates_clear {
            if let Some(arrival) = self.match_arrival(now, ball, iou, gap_frames) {
                let candidate = self
                    .candidates
                    .open(arrival.pattern, now, self.config.confirm_window_seconds);
                let expires_at = candidate.expires_at;
                self.sink.publish(&EngineEvent::CandidateOpened {
                    time: now,
                    pattern: arrival.pattern,
                    expires_at,
                    displacement: arrival.displacement,
                    gap_frames,
                });

                if let Some(via) = self.rim_confirmation(ball, hoop, iou) {
                    made = self.confirm(now, via);
                }
            }
        }

        self.last_inside_time = Some(now);
        made
    }

    fn on_ball_outside(&mut self, now: f64, ball: &NormBox, hoop: &NormBox, gates_clear: bool) -> Option<MakeEvent> {
        let mut made = None;

        if let Some(seen_in_zone) = self.candidates.pending().map(|c| c.seen_in_zone) {
            if seen_in_zone && gates_clear && self.is_below_hoop(ball, hoop) {
                made = self.confirm(now, ConfirmPath::BelowHoop);
            } else if let Some(candidate) = self.candidates.pending_mut() {
                // Streaks count consecutive frames only
                candidate.missing_streak = 0;
                candidate.outside_streak += 1;
                if candidate.outside_streak >= self.config.candidate_outside_max {
                    self.drop_candidate(now, DropReason::Invalidated);
                }
            }
        }

        self.last_outside = Some(Sighting::of(ball, now));
        made
    }

    fn on_ball_absent(&mut self, now: f64, gates_clear: bool) -> Option<MakeEvent> {
        self.gap_frames += 1;

        let disappeared = match self.candidates.pending_mut() {
            Some(candidate) => {
                candidate.outside_streak = 0;
                if candidate.seen_in_zone {
                    candidate.missing_streak += 1;
                }
                candidate.seen_in_zone && candidate.missing_streak >= self.config.disappear_frames
            }
            None => false,
        };

        if disappeared && gates_clear {
            self.confirm(now, ConfirmPath::Disappear)
        } else {
            None
        }
    }

    /// Outside -> inside transition, not a re-entry within the grace period
    fn is_fresh_arrival(&self, now: f64) -> bool {
        match self.last_inside_time {
            Some(t) => now - t > self.config.inside_grace_period,
            None => true,
        }
    }

    /// Arrival patterns in fixed precedence: A, B, C, then D
    fn match_arrival(&self, now: f64, ball: &NormBox, iou: f32, gap_frames: u32) -> Option<Arrival> {
        let (bx, by) = ball.center();

        let recent_outside = self
            .last_outside
            .filter(|o| now - o.time <= self.config.shot_window_seconds);

        if let Some(outside) = recent_outside {
            let displacement = outside.distance_to(bx, by);
            // A 0-1 frame "jump" this large is a detector identity switch, not motion
            let credible = gap_frames >= 2 || displacement <= self.config.max_short_gap_displacement;

            if credible {
                let pattern = if gap_frames >= 2 && displacement >= self.config.arrival_displacement {
                    Some(ArrivalPattern::PatternA)
                } else if displacement >= self.config.arrival_displacement {
                    Some(ArrivalPattern::PatternB)
                } else if iou > self.config.iou_threshold {
                    Some(ArrivalPattern::PatternC)
                } else {
                    None
                };

                if let Some(pattern) = pattern {
                    return Some(Arrival {
                        pattern,
                        displacement: Some(displacement),
                    });
                }
            }
        }

        let above = self.last_above_hoop?;
        if now - above.time <= self.config.descent_window_seconds && by - above.y > self.config.descent_min_drop {
            return Some(Arrival {
                pattern: ArrivalPattern::PatternD,
                displacement: Some(above.distance_to(bx, by)),
            });
        }

        None
    }

    /// Upgrade the pending candidate into a make, subject to the dedup gap
    fn confirm(&mut self, now: f64, via: ConfirmPath) -> Option<MakeEvent> {
        let candidate = self.candidates.confirm()?;

        // The same flight must not open another candidate
        self.last_outside = None;
        self.last_above_hoop = None;

        if let Some(previous) = self.events.last().map(|e| e.time) {
            if now - previous < self.config.dedup_gap_seconds {
                self.sink.publish(&EngineEvent::MakeSuppressed { time: now, previous });
                return None;
            }
        }

        let event = MakeEvent::make(now);
        self.events.push(event);
        self.make_cooldown.trigger(now);
        self.last_trigger_reason = Some(via.tag().to_string());
        self.last_arrival = Some(candidate.pattern);

        self.sink.publish(&EngineEvent::MakeConfirmed {
            time: now,
            pattern: candidate.pattern,
            via,
            make_count: self.events.len(),
        });

        Some(event)
    }

    fn drop_candidate(&mut self, now: f64, reason: DropReason) {
        if let Some((candidate, reason)) = self.candidates.drop_pending(reason) {
            self.sink.publish(&EngineEvent::CandidateDropped {
                time: now,
                pattern: candidate.pattern,
                reason,
            });
        }
    }

    fn finish_frame(
        &mut self,
        timestamp: f64,
        hoop_update: Option<HoopUpdate>,
        ball: Option<NormBox>,
        branch: FrameBranch,
        ball_iou: f32,
        ball_in_zone: bool,
    ) {
        let hoop = self.hoop.smoothed().copied();
        let cooldown_remaining = if hoop.is_some() {
            self.cooldown_remaining(timestamp)
        } else {
            self.make_cooldown.remaining(timestamp)
        };

        self.snapshot = DebugSnapshot {
            frame_index: self.frame_index,
            timestamp,
            hoop,
            ball,
            rim_line: hoop.as_ref().map(RimLine::from_hoop),
            hoop_locked: self.hoop.is_locked(),
            ball_in_zone,
            cooldown_remaining,
            make_count: self.events.len(),
            last_trigger_reason: self.last_trigger_reason.clone(),
            last_arrival: self.last_arrival,
            candidate: self.candidates.pending().cloned(),
        };

        self.sink.publish(&EngineEvent::Frame(FrameTrace {
            frame_index: self.frame_index,
            timestamp,
            hoop_update,
            hoop,
            ball,
            branch,
            ball_iou,
            gap_frames: self.gap_frames,
            cooldown_remaining,
        }));

        self.frame_index += 1;
    }
}

impl Default for ShotRuleEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
