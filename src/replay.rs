/// Recorded-detection replay
///
/// A recording is a JSON-lines file with one frame per line:
///
/// ```text
/// {"t": 0.083, "detections": [{"label": "hoop", "confidence": 0.92, "box": {"x": 0.45, "y": 0.3, "width": 0.1, "height": 0.06}}]}
/// ```
///
/// `ReplaySource` turns the timestamps back into pixel-less frames and
/// `ReplayDetector` answers each frame with what was recorded for it, so
/// the whole session can be re-run without a video decoder or a model.
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::detection::{Detection, Detector};
use crate::error::{DetectorError, SourceError};
use crate::geometry::{to_local, NormBox};
use crate::pipeline::{Frame, FrameSource};

/// Frames closer than this are the same frame
const MATCH_EPSILON: f64 = 1e-4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub t: f64,
    #[serde(default)]
    pub detections: Vec<Detection>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recording {
    frames: Vec<RecordedFrame>,
}

impl Recording {
    /// Build from frames; out-of-order frames are dropped
    pub fn new(frames: Vec<RecordedFrame>) -> Self {
        let mut recording = Self::default();
        for frame in frames {
            recording.push(frame);
        }
        recording
    }

    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(|source| SourceError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let recording = Self::from_reader(BufReader::new(file)).map_err(|e| match e {
            SourceError::Io { source, .. } => SourceError::Io {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })?;

        tracing::info!(
            "Loaded recording {} ({} frames, {:.2}s)",
            path.display(),
            recording.len(),
            recording.duration().unwrap_or(0.0)
        );
        Ok(recording)
    }

    /// Parse JSON lines; blank lines are ignored, line numbers are 1-based
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, SourceError> {
        let mut recording = Self::default();
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| SourceError::Io {
                path: "<reader>".to_string(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let frame: RecordedFrame =
                serde_json::from_str(&line).map_err(|source| SourceError::Parse { line: index + 1, source })?;
            recording.push(frame);
        }

        if recording.is_empty() {
            return Err(SourceError::NoVideoTrack);
        }
        Ok(recording)
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        for frame in &self.frames {
            serde_json::to_writer(&mut writer, frame)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()
    }

    fn push(&mut self, mut frame: RecordedFrame) {
        if let Some(last) = self.frames.last() {
            if frame.t <= last.t {
                tracing::warn!("Dropping out-of-order recorded frame at {:.3}s (after {:.3}s)", frame.t, last.t);
                return;
            }
        }
        for detection in &mut frame.detections {
            detection.timestamp = frame.t;
        }
        self.frames.push(frame);
    }

    pub fn frames(&self) -> &[RecordedFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn duration(&self) -> Option<f64> {
        self.frames.last().map(|f| f.t)
    }

    /// Average frame rate of the recording
    pub fn native_fps(&self) -> Option<f64> {
        let first = self.frames.first()?;
        let last = self.frames.last()?;
        let span = last.t - first.t;
        (span > 0.0).then(|| (self.frames.len() - 1) as f64 / span)
    }

    /// Source and detector replaying this recording
    pub fn into_replay(self) -> (ReplaySource, ReplayDetector) {
        (ReplaySource::new(&self), ReplayDetector::new(self))
    }
}

/// Pixel-less frames at the recorded timestamps
#[derive(Debug, Clone)]
pub struct ReplaySource {
    timestamps: Vec<f64>,
    next: usize,
    fps: Option<f64>,
}

impl ReplaySource {
    pub fn new(recording: &Recording) -> Self {
        Self {
            timestamps: recording.frames.iter().map(|f| f.t).collect(),
            next: 0,
            fps: recording.native_fps(),
        }
    }
}

impl FrameSource for ReplaySource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let Some(&timestamp) = self.timestamps.get(self.next) else {
            return Ok(None);
        };
        let frame = Frame::new(self.next as u64, timestamp, None);
        self.next += 1;
        Ok(Some(frame))
    }

    fn native_fps(&self) -> Option<f64> {
        self.fps
    }

    fn duration(&self) -> Option<f64> {
        self.timestamps.last().copied()
    }
}

/// Answers each frame with the detections recorded at its timestamp
#[derive(Debug, Clone)]
pub struct ReplayDetector {
    frames: Vec<RecordedFrame>,
    cursor: usize,
}

impl ReplayDetector {
    pub fn new(recording: Recording) -> Self {
        Self {
            frames: recording.frames,
            cursor: 0,
        }
    }

    fn recorded_at(&mut self, timestamp: f64) -> Option<&RecordedFrame> {
        // Frames arrive in order; rewind only if asked about the past
        if self.frames.get(self.cursor).is_some_and(|f| f.t > timestamp + MATCH_EPSILON) {
            self.cursor = 0;
        }
        while self.frames.get(self.cursor).is_some_and(|f| f.t < timestamp - MATCH_EPSILON) {
            self.cursor += 1;
        }
        self.frames
            .get(self.cursor)
            .filter(|f| (f.t - timestamp).abs() <= MATCH_EPSILON)
    }
}

impl Detector for ReplayDetector {
    fn detect(&mut self, frame: &Frame, region: Option<&NormBox>) -> Result<Vec<Detection>, DetectorError> {
        let Some(recorded) = self.recorded_at(frame.timestamp) else {
            return Ok(Vec::new());
        };

        let Some(region) = region else {
            return Ok(recorded.detections.clone());
        };

        Ok(recorded
            .detections
            .iter()
            .filter(|d| {
                let (cx, cy) = d.bbox.center();
                region.contains_point(cx, cy)
            })
            .filter_map(|d| {
                to_local(&d.bbox, region).map(|bbox| Detection {
                    bbox,
                    ..*d
                })
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "replay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Label;

    const SAMPLE: &str = r#"{"t": 0.0, "detections": [{"label": "hoop", "confidence": 0.9, "box": {"x": 0.45, "y": 0.3, "width": 0.1, "height": 0.06}}]}

{"t": 0.5, "detections": [{"label": "ball", "confidence": 0.8, "box": {"x": 0.1, "y": 0.1, "width": 0.03, "height": 0.03}}]}
{"t": 1.0}
"#;

    #[test]
    fn test_parse_recording() {
        let recording = Recording::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(recording.len(), 3);
        assert_eq!(recording.frames()[0].detections[0].label, Label::Hoop);
        assert_eq!(recording.frames()[1].detections[0].timestamp, 0.5);
        assert!(recording.frames()[2].detections.is_empty());
        assert!((recording.native_fps().unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_error_reports_line() {
        let input = "{\"t\": 0.0}\n{\"t\": oops}\n";
        match Recording::from_reader(input.as_bytes()) {
            Err(SourceError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_recording_has_no_track() {
        assert!(matches!(Recording::from_reader("\n".as_bytes()), Err(SourceError::NoVideoTrack)));
    }

    #[test]
    fn test_out_of_order_frames_dropped() {
        let recording = Recording::new(vec![
            RecordedFrame { t: 1.0, detections: vec![] },
            RecordedFrame { t: 0.5, detections: vec![] },
            RecordedFrame { t: 2.0, detections: vec![] },
        ]);
        assert_eq!(recording.len(), 2);
    }

    #[test]
    fn test_replay_round() {
        let (mut source, mut detector) = Recording::from_reader(SAMPLE.as_bytes()).unwrap().into_replay();

        let first = source.next_frame().unwrap().unwrap();
        let detections = detector.detect(&first, None).unwrap();
        assert_eq!(detections.len(), 1);

        let second = source.next_frame().unwrap().unwrap();
        assert_eq!(second.index, 1);
        assert_eq!(detector.detect(&second, None).unwrap()[0].label, Label::Ball);

        // Timestamp that was never recorded
        let missing = Frame::new(99, 0.75, None);
        assert!(detector.detect(&missing, None).unwrap().is_empty());

        source.next_frame().unwrap();
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_region_filters_and_relativizes() {
        let (_, mut detector) = Recording::from_reader(SAMPLE.as_bytes()).unwrap().into_replay();
        let region = NormBox::new(0.4, 0.2, 0.2, 0.2);

        let hoop = detector.detect(&Frame::new(0, 0.0, None), Some(&region)).unwrap();
        assert_eq!(hoop.len(), 1);
        assert!((hoop[0].bbox.x - 0.25).abs() < 1e-5);
        assert!((hoop[0].bbox.width - 0.5).abs() < 1e-5);

        // Ball at (0.115, 0.115) lies outside the region
        let ball = detector.detect(&Frame::new(1, 0.5, None), Some(&region)).unwrap();
        assert!(ball.is_empty());
    }

    #[test]
    fn test_write_then_load() {
        let recording = Recording::from_reader(SAMPLE.as_bytes()).unwrap();
        let mut buffer = Vec::new();
        recording.write_to(&mut buffer).unwrap();
        assert_eq!(Recording::from_reader(buffer.as_slice()).unwrap(), recording);
    }
}
