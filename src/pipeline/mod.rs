/// Orchestration pipeline
///
/// Owns no detection logic: pulls frames from a source, runs the external
/// detector and feeds the rule engine in order.
///
/// ## Architecture
///
/// ```text
/// ┌─────────────┐  bounded   ┌──────────┐   ┌────────────────┐
/// │ FrameSource │ ─────────> │ Detector │ ─>│ ShotRuleEngine │ ─> Progress callback
/// │ + Sampler   │  channel   └──────────┘   └────────────────┘
/// └─────────────┘
///  decoder thread            ───────── consumer thread ─────────
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// let mut engine = ShotRuleEngine::new(EngineConfig::default());
/// let report = detect_makes(
///     &mut source,
///     &mut detector,
///     &mut engine,
///     &PipelineSettings::default(),
///     &ExecutionBudget::detect(),
///     &CancelToken::new(),
///     |progress| tracing::debug!("{:.0}%", progress.fraction * 100.0),
/// )?;
/// ```

pub mod budget;
pub mod cancel;
pub mod region;
pub mod session;
pub mod settings;
pub mod source;

// Re-export commonly used types
pub use budget::ExecutionBudget;
pub use cancel::CancelToken;
pub use region::{RegionTracker, RegionTracking};
pub use session::{detect_makes, preview_crop, Progress, SessionReport, SessionStatus};
pub use settings::PipelineSettings;
pub use source::{Frame, FrameSampler, FrameSource, SampleDecision, VecSource};
