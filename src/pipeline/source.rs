/// Frame sources and rate sampling
use image::RgbImage;

use crate::error::SourceError;

/// Timestamps closer than this are treated as equal
const TIME_EPSILON: f64 = 1e-6;

/// One decoded frame
#[derive(Debug, Clone)]
pub struct Frame {
    /// Index in the source's native frame sequence
    pub index: u64,
    /// Presentation time in seconds
    pub timestamp: f64,
    /// Pixel data; `None` for sources that replay recorded detections
    pub image: Option<RgbImage>,
}

impl Frame {
    pub fn new(index: u64, timestamp: f64, image: Option<RgbImage>) -> Self {
        Self { index, timestamp, image }
    }
}

/// A decoder producing frames with monotonically increasing timestamps
pub trait FrameSource: Send {
    /// Next frame, or `Ok(None)` at end of stream
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;

    /// Native frame rate, when known
    fn native_fps(&self) -> Option<f64> {
        None
    }

    /// Total stream length in seconds, when known
    fn duration(&self) -> Option<f64> {
        None
    }
}

/// What to do with a decoded frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleDecision {
    Take,
    Skip,
    /// Past the end of the configured window; stop decoding
    Finished,
}

/// Sub-samples a native-rate stream down to a target rate inside `[start, start + max_duration]`
#[derive(Debug, Clone)]
pub struct FrameSampler {
    interval: f64,
    start: f64,
    end: Option<f64>,
    next_due: Option<f64>,
    last_seen: Option<f64>,
}

impl FrameSampler {
    pub fn new(target_fps: f64, start: f64, max_duration: Option<f64>) -> Self {
        let start = start.max(0.0);
        Self {
            interval: 1.0 / target_fps.max(f64::MIN_POSITIVE),
            start,
            end: max_duration.map(|d| start + d.max(0.0)),
            next_due: None,
            last_seen: None,
        }
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> Option<f64> {
        self.end
    }

    pub fn decide(&mut self, timestamp: f64) -> SampleDecision {
        if let Some(last) = self.last_seen {
            if timestamp - last > 2.0 * self.interval + TIME_EPSILON && timestamp >= self.start {
                tracing::warn!(
                    "Frame source skipped {:.3}s of video ({:.3}s -> {:.3}s)",
                    timestamp - last,
                    last,
                    timestamp
                );
            }
        }
        self.last_seen = Some(timestamp);

        if timestamp + TIME_EPSILON < self.start {
            return SampleDecision::Skip;
        }
        if let Some(end) = self.end {
            if timestamp > end + TIME_EPSILON {
                return SampleDecision::Finished;
            }
        }

        match self.next_due {
            Some(due) if timestamp + TIME_EPSILON < due => SampleDecision::Skip,
            Some(due) => {
                // Stay on the grid unless the source fell behind it
                let next = due + self.interval;
                self.next_due = Some(if next <= timestamp { timestamp + self.interval } else { next });
                SampleDecision::Take
            }
            None => {
                self.next_due = Some(timestamp + self.interval);
                SampleDecision::Take
            }
        }
    }
}

/// Frames already in memory, mostly for tests and synthetic input
#[derive(Debug, Default)]
pub struct VecSource {
    frames: std::collections::VecDeque<Frame>,
    fps: Option<f64>,
}

impl VecSource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
            fps: None,
        }
    }

    /// Pixel-less frames at a fixed rate
    pub fn blank(fps: f64, count: u64) -> Self {
        let frames = (0..count).map(|i| Frame::new(i, i as f64 / fps, None)).collect();
        Self {
            frames,
            fps: Some(fps),
        }
    }
}

impl FrameSource for VecSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        Ok(self.frames.pop_front())
    }

    fn native_fps(&self) -> Option<f64> {
        self.fps
    }

    fn duration(&self) -> Option<f64> {
        self.frames.back().map(|f| f.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taken(sampler: &mut FrameSampler, timestamps: impl Iterator<Item = f64>) -> Vec<f64> {
        let mut out = Vec::new();
        for t in timestamps {
            match sampler.decide(t) {
                SampleDecision::Take => out.push(t),
                SampleDecision::Skip => {}
                SampleDecision::Finished => break,
            }
        }
        out
    }

    #[test]
    fn test_subsamples_30_to_10() {
        let mut sampler = FrameSampler::new(10.0, 0.0, None);
        let got = taken(&mut sampler, (0..30).map(|i| i as f64 / 30.0));
        assert_eq!(got.len(), 10);
        assert!((got[1] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_respects_window() {
        let mut sampler = FrameSampler::new(10.0, 1.0, Some(0.5));
        let got = taken(&mut sampler, (0..60).map(|i| i as f64 / 30.0));
        assert!((got[0] - 1.0).abs() < 1e-6);
        assert!(got.iter().all(|t| *t <= 1.5 + 1e-6));
        assert_eq!(got.len(), 6);
    }

    #[test]
    fn test_source_slower_than_target_takes_every_frame() {
        let mut sampler = FrameSampler::new(30.0, 0.0, None);
        let got = taken(&mut sampler, (0..10).map(|i| i as f64 / 10.0));
        assert_eq!(got.len(), 10);
    }

    #[test]
    fn test_vec_source_drains() {
        let mut source = VecSource::blank(10.0, 3);
        assert!((source.duration().unwrap() - 0.2).abs() < 1e-9);
        assert_eq!(source.next_frame().unwrap().unwrap().index, 0);
        source.next_frame().unwrap();
        source.next_frame().unwrap();
        assert!(source.next_frame().unwrap().is_none());
    }
}
