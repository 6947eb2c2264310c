// Shared fixtures for the integration tests
#![allow(dead_code)]

use hoop_highlights::replay::RecordedFrame;
use hoop_highlights::{Detection, MakeEvent, NormBox, ShotRuleEngine};

/// Fixed hoop used by every scenario: center (0.5, 0.33), bottom edge at 0.36
pub const HOOP: NormBox = NormBox {
    x: 0.45,
    y: 0.30,
    width: 0.10,
    height: 0.06,
};

pub const FPS: f64 = 12.0;

/// Small ball box centered on (cx, cy)
pub fn ball(cx: f32, cy: f32) -> NormBox {
    NormBox::from_center(cx, cy, 0.03, 0.03)
}

/// Ball resting on the rim, IoU 0.10 with `HOOP`
pub fn ball_on_rim() -> NormBox {
    NormBox::new(0.485, 0.31, 0.03, 0.02)
}

pub fn detections(t: f64, hoop: NormBox, ball_box: Option<NormBox>) -> Vec<Detection> {
    let mut detections = vec![Detection::hoop(0.9, hoop, t)];
    if let Some(b) = ball_box {
        detections.push(Detection::ball(0.8, b, t));
    }
    detections
}

pub fn step(engine: &mut ShotRuleEngine, t: f64, ball_box: Option<NormBox>) -> Option<MakeEvent> {
    engine.consume_frame(t, &detections(t, HOOP, ball_box))
}

pub fn recorded(t: f64, ball_box: Option<NormBox>) -> RecordedFrame {
    RecordedFrame {
        t,
        detections: detections(t, HOOP, ball_box),
    }
}

/// Outside the zone, two missing frames, then on the rim at t = 0.25
pub fn pattern_a_shot() -> Vec<(f64, Option<NormBox>)> {
    vec![
        (0.0, Some(ball(0.30, 0.33))),
        (1.0 / FPS, None),
        (2.0 / FPS, None),
        (3.0 / FPS, Some(ball_on_rim())),
    ]
}

pub fn assert_spaced(events: &[MakeEvent], min_gap: f64) {
    for pair in events.windows(2) {
        assert!(
            pair[1].time - pair[0].time >= min_gap - 1e-9,
            "events {:.3}s and {:.3}s closer than {}s",
            pair[0].time,
            pair[1].time,
            min_gap
        );
    }
}
