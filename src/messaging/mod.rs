/// Messaging module for engine diagnostics
///
/// The rule engine publishes what it decided (frame traces, candidate
/// lifecycle, makes) to a pluggable sink instead of writing logs itself.
///
/// ## Architecture
///
/// ```text
/// ┌──────────────┐   EngineEvent   ┌────────────────┐
/// │ ShotRule-    │ ──────────────> │ DiagnosticSink │
/// │ Engine       │                 └────────────────┘
/// └──────────────┘                   ├── TracingSink   (log lines)
///                                    ├── JsonLinesSink (persisted trail)
///                                    ├── EventBus      (crossbeam subscribers)
///                                    └── FanoutSink    (several of the above)
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// let bus = EventBus::new();
/// let (rx, _id) = bus.subscribe();
///
/// let mut engine = ShotRuleEngine::with_sink(EngineConfig::default(), Box::new(bus.clone()));
/// engine.consume_frame(0.0, &detections);
///
/// while let Ok(event) = rx.try_recv() {
///     println!("{}", event.description());
/// }
/// ```

pub mod bus;
pub mod events;
pub mod sink;

// Re-export commonly used types
pub use bus::{EventBus, SubscriberId};
pub use events::{EngineEvent, FrameBranch, FrameTrace};
pub use sink::{DiagnosticSink, FanoutSink, JsonLinesSink, NullSink, TracingSink};
