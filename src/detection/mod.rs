/// Detection module
///
/// Value types exchanged with the external object detector, plus the
/// per-frame selection helpers the rule engine relies on.
///
/// ## Architecture
///
/// ```text
/// Frame ──> Detector (external model) ──> Vec<Detection>
///                                            ├── best hoop (highest confidence)
///                                            └── best ball (confidence vs. distance to hoop)
/// ```

pub mod detector;

// Re-export commonly used types
pub use detector::{best_ball_near, best_by_confidence, Detection, Detector, Label};
