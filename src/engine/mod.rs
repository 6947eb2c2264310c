/// Shot rule engine module
///
/// The stateful core that turns noisy per-frame ball/hoop detections into
/// deduplicated "made basket" events.
///
/// ## Architecture
///
/// ```text
/// ShotRuleEngine
///   ├── HoopTrack         (EMA-smoothed hoop, hard reset on scene cuts)
///   ├── CandidateTracker  (Idle -> Pending -> {Confirmed, Expired, Invalidated})
///   ├── Cooldown          (minimum spacing between makes)
///   └── DiagnosticSink    (pluggable reasoning trail)
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// let mut engine = ShotRuleEngine::new(EngineConfig::default());
/// engine.reset();
///
/// for (timestamp, detections) in frames {
///     if let Some(make) = engine.consume_frame(timestamp, &detections) {
///         println!("Make at {:.2}s", make.time);
///     }
/// }
/// ```

pub mod candidate;
pub mod config;
pub mod event;
pub mod hoop_track;
pub mod rule_engine;
pub mod snapshot;

// Re-export commonly used types
pub use candidate::{ArrivalPattern, Candidate, ConfirmPath, DropReason};
pub use config::EngineConfig;
pub use event::{EventKind, MakeEvent};
pub use hoop_track::{HoopTrack, HoopUpdate};
pub use rule_engine::ShotRuleEngine;
pub use snapshot::DebugSnapshot;
