// End-to-end behavior of the shot rule engine on scripted detection sequences

mod common;

use common::*;
use hoop_highlights::engine::ArrivalPattern;
use hoop_highlights::geometry::{derive_region_from_detections, expand_and_clamp};
use hoop_highlights::messaging::{EngineEvent, EventBus, NullSink};
use hoop_highlights::{Detection, EngineConfig, MakeEvent, NormBox, ShotRuleEngine};

fn engine() -> ShotRuleEngine {
    ShotRuleEngine::with_sink(EngineConfig::default(), Box::new(NullSink))
}

/// Ball enters the zone at t = 1.0 from outside and leaves a pending candidate
fn open_candidate(engine: &mut ShotRuleEngine) {
    assert!(step(engine, 0.9, Some(ball(0.35, 0.42))).is_none());
    assert!(step(engine, 1.0, Some(ball(0.5, 0.42))).is_none());
    assert!(engine.debug_snapshot().candidate.is_some());
}

#[test]
fn test_pattern_a_confirms_on_arrival_frame() {
    let bus = EventBus::new();
    let (rx, _id) = bus.subscribe();
    let mut engine = ShotRuleEngine::with_sink(EngineConfig::default(), Box::new(bus.clone()));

    let mut made = Vec::new();
    for (t, b) in pattern_a_shot() {
        made.extend(step(&mut engine, t, b));
    }

    assert_eq!(made, vec![MakeEvent::make(0.25)]);
    assert_eq!(engine.detected_makes(), &[MakeEvent::make(0.25)]);

    let snapshot = engine.debug_snapshot();
    assert_eq!(snapshot.last_arrival, Some(ArrivalPattern::PatternA));
    assert_eq!(snapshot.last_trigger_reason.as_deref(), Some("iou"));
    assert_eq!(snapshot.make_count, 1);
    assert!(snapshot.candidate.is_none());

    let lifecycle: Vec<EngineEvent> = rx.try_iter().collect();
    assert!(lifecycle.iter().any(|e| matches!(
        e,
        EngineEvent::CandidateOpened {
            pattern: ArrivalPattern::PatternA,
            gap_frames: 2,
            ..
        }
    )));
    assert!(lifecycle
        .iter()
        .any(|e| matches!(e, EngineEvent::MakeConfirmed { make_count: 1, .. })));
}

#[test]
fn test_disappearance_confirms_on_third_missing_frame() {
    let mut engine = engine();
    open_candidate(&mut engine);

    assert!(step(&mut engine, 1.1, None).is_none());
    assert!(step(&mut engine, 1.2, None).is_none());
    assert_eq!(step(&mut engine, 1.3, None), Some(MakeEvent::make(1.3)));

    assert_eq!(engine.debug_snapshot().last_trigger_reason.as_deref(), Some("disappear"));
    assert_eq!(engine.debug_snapshot().last_arrival, Some(ArrivalPattern::PatternB));
}

#[test]
fn test_outside_streak_invalidates_candidate() {
    let mut engine = engine();
    open_candidate(&mut engine);

    // Beside the zone, not under the net
    step(&mut engine, 1.1, Some(ball(0.42, 0.42)));
    step(&mut engine, 1.2, Some(ball(0.41, 0.42)));
    step(&mut engine, 1.3, Some(ball(0.42, 0.42)));
    assert!(engine.debug_snapshot().candidate.is_none());

    // Re-entry within the grace period is not a new arrival
    step(&mut engine, 1.4, Some(ball(0.44, 0.42)));
    for t in [1.5, 1.6, 1.7, 1.8] {
        assert!(step(&mut engine, t, None).is_none());
    }
    assert!(engine.detected_makes().is_empty());
}

#[test]
fn test_outside_frame_restarts_missing_count() {
    let mut engine = engine();
    open_candidate(&mut engine);

    assert!(step(&mut engine, 1.1, None).is_none());
    assert!(step(&mut engine, 1.2, None).is_none());
    // Seen again beside the zone: the ball did not vanish through the net
    assert!(step(&mut engine, 1.3, Some(ball(0.42, 0.42))).is_none());
    assert!(step(&mut engine, 1.4, None).is_none());
    assert!(step(&mut engine, 1.5, None).is_none());
    assert_eq!(step(&mut engine, 1.6, None), Some(MakeEvent::make(1.6)));
    assert_eq!(engine.debug_snapshot().last_trigger_reason.as_deref(), Some("disappear"));
}

#[test]
fn test_missing_frame_restarts_outside_count() {
    let mut engine = engine();
    open_candidate(&mut engine);

    step(&mut engine, 1.1, Some(ball(0.42, 0.42)));
    step(&mut engine, 1.2, None);
    step(&mut engine, 1.3, Some(ball(0.42, 0.42)));
    step(&mut engine, 1.4, None);
    step(&mut engine, 1.5, Some(ball(0.42, 0.42)));

    let candidate = engine.debug_snapshot().candidate.clone().unwrap();
    assert_eq!(candidate.outside_streak, 1);
    assert_eq!(candidate.missing_streak, 0);
    assert!(engine.detected_makes().is_empty());
}

#[test]
fn test_pattern_c_small_move_onto_hoop() {
    let mut engine = engine();
    // Just left of the zone, not touching the hoop
    step(&mut engine, 0.0, Some(ball(0.42, 0.33)));
    assert!(engine.debug_snapshot().candidate.is_none());

    // 0.03 shift, but the box now covers the left of the hoop
    let overlapping = NormBox::from_center(0.45, 0.33, 0.06, 0.06);
    assert!(overlapping.iou(&HOOP) > 0.08);
    assert_eq!(step(&mut engine, 0.1, Some(overlapping)), Some(MakeEvent::make(0.1)));

    let snapshot = engine.debug_snapshot();
    assert_eq!(snapshot.last_arrival, Some(ArrivalPattern::PatternC));
    assert_eq!(snapshot.last_trigger_reason.as_deref(), Some("iou"));
}

#[test]
fn test_earlier_pattern_wins_over_descent() {
    let mut engine = engine();
    // Above the hoop: a valid descent start
    step(&mut engine, 0.0, Some(ball(0.5, 0.26)));
    // Beside the zone
    step(&mut engine, 0.1, Some(ball(0.40, 0.34)));
    // Enters 0.10 from the side sighting and 0.08 below the descent start
    assert_eq!(step(&mut engine, 0.2, Some(ball(0.5, 0.34))), Some(MakeEvent::make(0.2)));
    assert_eq!(engine.debug_snapshot().last_arrival, Some(ArrivalPattern::PatternB));
}

#[test]
fn test_outside_sighting_goes_stale() {
    let arrive_at = |t: f64| {
        let mut engine = engine();
        step(&mut engine, 0.0, Some(ball(0.35, 0.42)));
        step(&mut engine, t, Some(ball(0.5, 0.42)));
        engine.debug_snapshot().candidate.as_ref().map(|c| c.pattern)
    };

    assert_eq!(arrive_at(7.5), Some(ArrivalPattern::PatternB));
    assert_eq!(arrive_at(8.5), None);
}

#[test]
fn test_descent_window_expires() {
    let descend_at = |t: f64| {
        let mut engine = engine();
        step(&mut engine, 0.0, Some(ball(0.5, 0.26)));
        let made = step(&mut engine, t, Some(ball(0.5, 0.295)));
        (made, engine.debug_snapshot().last_arrival)
    };

    assert_eq!(descend_at(1.4), (Some(MakeEvent::make(1.4)), Some(ArrivalPattern::PatternD)));
    assert_eq!(descend_at(1.6), (None, None));
}

#[test]
fn test_hoop_reset_discards_pending_candidate() {
    let mut engine = engine();
    open_candidate(&mut engine);

    let moved = NormBox::new(0.05, 0.30, 0.10, 0.06);
    let step_moved = |engine: &mut ShotRuleEngine, t: f64, b: Option<NormBox>| {
        engine.consume_frame(t, &common::detections(t, moved, b))
    };

    assert!(step_moved(&mut engine, 1.1, None).is_none());
    let snapshot = engine.debug_snapshot();
    assert_eq!(snapshot.hoop, Some(moved));
    assert!(snapshot.candidate.is_none());

    // The old candidate would have confirmed by disappearance here
    assert!(step_moved(&mut engine, 1.2, None).is_none());
    assert!(step_moved(&mut engine, 1.3, None).is_none());

    // Arrivals during the reset cooldown are ignored
    step_moved(&mut engine, 1.5, Some(ball(0.25, 0.42)));
    step_moved(&mut engine, 1.6, Some(ball(0.10, 0.42)));
    assert!(engine.debug_snapshot().candidate.is_none());
    assert!(engine.debug_snapshot().cooldown_remaining > 0.0);

    // ...but not after it
    step_moved(&mut engine, 4.0, Some(ball(0.25, 0.42)));
    step_moved(&mut engine, 4.1, Some(ball(0.10, 0.42)));
    assert_eq!(
        engine.debug_snapshot().candidate.as_ref().map(|c| c.pattern),
        Some(ArrivalPattern::PatternB)
    );
    assert!(engine.detected_makes().is_empty());
}

#[test]
fn test_hoop_reset_forgets_old_sightings() {
    let mut engine = engine();
    open_candidate(&mut engine);

    let moved = NormBox::new(0.05, 0.30, 0.10, 0.06);
    for i in 11..=36 {
        let t = i as f64 * 0.1;
        engine.consume_frame(t, &common::detections(t, moved, None));
    }

    // The sighting at 0.9 belonged to the old view and must not pair with this one
    let t = 3.7;
    assert!(engine
        .consume_frame(t, &common::detections(t, moved, Some(ball(0.10, 0.42))))
        .is_none());
    assert_eq!(engine.debug_snapshot().cooldown_remaining, 0.0);
    assert!(engine.debug_snapshot().candidate.is_none());
}

#[test]
fn test_ema_converges_monotonically() {
    let mut engine = engine();
    let target = NormBox::new(0.50, 0.32, 0.10, 0.06);
    engine.consume_frame(0.0, &[Detection::hoop(0.9, HOOP, 0.0)]);

    let mut last_distance = f32::MAX;
    for i in 1..10 {
        let t = i as f64 / FPS;
        engine.consume_frame(t, &[Detection::hoop(0.9, target, t)]);
        let smoothed = engine.debug_snapshot().hoop.unwrap();
        let distance = smoothed.center_distance(&target);
        assert!(distance < last_distance || distance < 1e-6);
        last_distance = distance;
    }
    assert!(last_distance < 1e-3);
}

#[test]
fn test_cooldown_blocks_second_arrival() {
    let mut engine = engine();
    open_candidate(&mut engine);
    step(&mut engine, 1.1, None);
    step(&mut engine, 1.2, None);
    assert!(step(&mut engine, 1.3, None).is_some());

    // Second shot 1.7s later, well inside the 6s cooldown
    step(&mut engine, 2.9, Some(ball(0.35, 0.42)));
    step(&mut engine, 3.0, Some(ball(0.5, 0.42)));
    assert!(engine.debug_snapshot().candidate.is_none());
    assert!((engine.debug_snapshot().cooldown_remaining - 4.3).abs() < 1e-6);
    for t in [3.1, 3.2, 3.3] {
        assert!(step(&mut engine, t, None).is_none());
    }

    // After the cooldown the same motion counts again
    step(&mut engine, 7.4, Some(ball(0.35, 0.42)));
    step(&mut engine, 7.5, Some(ball(0.5, 0.42)));
    step(&mut engine, 7.6, None);
    step(&mut engine, 7.7, None);
    assert_eq!(step(&mut engine, 7.8, None), Some(MakeEvent::make(7.8)));

    assert_eq!(engine.detected_makes(), &[MakeEvent::make(1.3), MakeEvent::make(7.8)]);
}

#[test]
fn test_dedup_gap_without_cooldown() {
    let config = EngineConfig {
        cooldown_seconds: 0.0,
        ..EngineConfig::default()
    };
    let mut engine = ShotRuleEngine::with_sink(config, Box::new(NullSink));

    // A rim-touching arrival every 0.6s
    for k in 0..10 {
        let base = k as f64 * 0.6;
        step(&mut engine, base, Some(ball(0.35, 0.42)));
        step(&mut engine, base + 0.1, Some(ball_on_rim()));
    }

    let events = engine.detected_makes();
    assert_eq!(events.len(), 5);
    assert_spaced(events, 1.0);
}

#[test]
fn test_reset_starts_a_new_session() {
    let mut engine = engine();
    for (t, b) in pattern_a_shot() {
        step(&mut engine, t, b);
    }
    assert_eq!(engine.make_count(), 1);

    engine.reset();
    assert!(engine.detected_makes().is_empty());
    assert!(engine.hoop_box().is_none());

    // Same footage again produces the same result, no cooldown carried over
    for (t, b) in pattern_a_shot() {
        step(&mut engine, t, b);
    }
    assert_eq!(engine.detected_makes(), &[MakeEvent::make(0.25)]);
}

#[test]
fn test_region_from_overlapping_hoop() {
    let user_box = NormBox::new(0.40, 0.25, 0.20, 0.15);
    let detections = vec![
        Detection::hoop(0.9, HOOP, 0.0),
        Detection::hoop(0.95, NormBox::new(0.0, 0.0, 0.05, 0.05), 0.0),
    ];

    let region = derive_region_from_detections(&detections, &user_box, None);
    let expected = expand_and_clamp(&HOOP, 2.2);
    assert_eq!(region, expected);
    assert!((region.width - 0.22).abs() < 1e-5);
    assert!((region.x - 0.39).abs() < 1e-5);
}

#[test]
fn test_region_from_user_box_without_hoop() {
    let user_box = NormBox::new(0.40, 0.25, 0.20, 0.15);
    let far_hoop = vec![Detection::hoop(0.9, NormBox::new(0.0, 0.0, 0.05, 0.05), 0.0)];

    let region = derive_region_from_detections(&far_hoop, &user_box, None);
    assert!((region.x - 0.28).abs() < 1e-5);
    assert!((region.y - 0.16).abs() < 1e-5);
    assert!((region.width - 0.44).abs() < 1e-5);

    // Near the corner the expansion is clipped to the frame
    let corner = NormBox::new(0.85, 0.85, 0.1, 0.1);
    let clipped = derive_region_from_detections(&[], &corner, None);
    assert!(clipped.max_x() <= 1.0 + 1e-6);
    assert!(clipped.max_y() <= 1.0 + 1e-6);
}
