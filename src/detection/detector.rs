/// Detector trait and detection value types
///
/// Defines the per-frame values handed over by the external object detector
/// and the interface every detector backend implements.
use serde::{Deserialize, Serialize};

use crate::error::DetectorError;
use crate::geometry::NormBox;
use crate::pipeline::Frame;

/// Object class reported by the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Ball,
    Hoop,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Ball => "ball",
            Label::Hoop => "hoop",
        }
    }
}

/// A single labeled, confidence-scored box observed in one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: Label,
    /// Confidence level (0.0-1.0)
    pub confidence: f32,
    /// Normalized box, y grows downward
    #[serde(rename = "box")]
    pub bbox: NormBox,
    /// Frame timestamp in seconds
    #[serde(default)]
    pub timestamp: f64,
}

impl Detection {
    pub fn new(label: Label, confidence: f32, bbox: NormBox, timestamp: f64) -> Self {
        Self {
            label,
            confidence,
            bbox,
            timestamp,
        }
    }

    pub fn ball(confidence: f32, bbox: NormBox, timestamp: f64) -> Self {
        Self::new(Label::Ball, confidence, bbox, timestamp)
    }

    pub fn hoop(confidence: f32, bbox: NormBox, timestamp: f64) -> Self {
        Self::new(Label::Hoop, confidence, bbox, timestamp)
    }
}

/// Most confident detection carrying `label`, if any
pub fn best_by_confidence(detections: &[Detection], label: Label) -> Option<&Detection> {
    detections
        .iter()
        .filter(|d| d.label == label)
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
}

/// Ball detection that best trades confidence against distance to `anchor`
///
/// Scores each ball as `confidence - distance_weight * distance(center, anchor center)`.
/// A confident ball far from the hoop (held by a distant player) loses to an
/// equally confident ball near it.
pub fn best_ball_near(detections: &[Detection], anchor: &NormBox, distance_weight: f32) -> Option<Detection> {
    detections
        .iter()
        .filter(|d| d.label == Label::Ball)
        .map(|d| (d.confidence - distance_weight * d.bbox.center_distance(anchor), d))
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, d)| *d)
}

/// Detector trait
///
/// Implement this trait to plug an object-detection backend into the
/// orchestration loop.
pub trait Detector: Send {
    /// Run inference on one frame
    ///
    /// When `region` is given, inference may be restricted to it and the
    /// returned boxes are relative to that region (the caller maps them back
    /// with [`crate::geometry::to_global`]). Without a region, boxes are
    /// full-frame.
    ///
    /// `DetectorError::ModelUnavailable` is fatal for the session; any other
    /// error only drops this frame's detections.
    fn detect(&mut self, frame: &Frame, region: Option<&NormBox>) -> Result<Vec<Detection>, DetectorError>;

    /// Get detector name (for logging)
    fn name(&self) -> &'static str;
}
