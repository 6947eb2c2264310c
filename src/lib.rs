//! Hoop Highlights
//!
//! Finds made baskets in basketball footage from per-frame ball and hoop
//! detections, producing `{ time, type: "make" }` events for clip extraction.
//!
//! ## Architecture
//!
//! ```text
//! FrameSource ──> Detector ──> ShotRuleEngine ──> [MakeEvent]
//!   (pipeline)    (detection)     (engine)
//!                                    │
//!                                    └──> DiagnosticSink (messaging)
//! ```
//!
//! `geometry` holds the normalized box math shared by every layer and
//! `replay` re-runs recorded detections without a decoder or a model.

pub mod config;
pub mod detection;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod messaging;
pub mod pipeline;
pub mod replay;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use detection::{Detection, Detector, Label};
pub use engine::{DebugSnapshot, EngineConfig, MakeEvent, ShotRuleEngine};
pub use error::{AppResult, ConfigError, DetectorError, SessionError, SourceError};
pub use geometry::NormBox;
pub use pipeline::{detect_makes, CancelToken, ExecutionBudget, PipelineSettings, SessionReport, SessionStatus};
pub use replay::{Recording, ReplayDetector, ReplaySource};
