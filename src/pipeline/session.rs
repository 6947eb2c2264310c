/// Detection session
///
/// Drives a frame source and a detector through the rule engine:
/// 1. Decode and sub-sample frames on a scoped decoder thread
/// 2. Run the detector on each sampled frame (consumer thread)
/// 3. Map region-relative boxes back to the full frame and move the region with the hoop
/// 4. Feed the engine strictly in timestamp order
/// 5. Report progress
///
/// Decoding of the next frames overlaps with detection of the current one
/// through a small bounded channel; the engine only ever sees one detection
/// set at a time, on a single thread.
use std::time::Instant;

use crossbeam_channel::{bounded, Receiver, Sender};
use image::{imageops, RgbImage};
use serde::Serialize;

use super::budget::ExecutionBudget;
use super::cancel::CancelToken;
use super::region::RegionTracker;
use super::settings::PipelineSettings;
use super::source::{Frame, FrameSampler, FrameSource, SampleDecision};
use crate::detection::{Detection, Detector};
use crate::engine::{DebugSnapshot, MakeEvent, ShotRuleEngine};
use crate::error::{SessionError, SourceError};
use crate::geometry::{clamp, to_global, NormBox};
use crate::utils::{FrameTiming, LatencyStats};

/// Frames decoded ahead of the detector
const DECODE_AHEAD: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Completed,
    /// Stopped by the caller; events found so far are kept
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub events: Vec<MakeEvent>,
    pub frames_processed: u64,
    /// Frames whose detector call failed and were treated as empty
    pub frames_failed: u64,
    pub status: SessionStatus,
    /// Sampling rate actually used after the execution budget was applied
    pub effective_fps: f64,
}

impl SessionReport {
    pub fn is_cancelled(&self) -> bool {
        self.status == SessionStatus::Cancelled
    }

    /// Turn a cancelled session into an error for callers that treat it as one
    pub fn completed(self) -> Result<Self, SessionError> {
        match self.status {
            SessionStatus::Completed => Ok(self),
            SessionStatus::Cancelled => Err(SessionError::Cancelled),
        }
    }
}

/// Per-frame progress handed to the caller
#[derive(Debug)]
pub struct Progress<'a> {
    /// Share of the analysed window covered so far, in [0, 1]
    pub fraction: f64,
    pub timestamp: f64,
    pub snapshot: &'a DebugSnapshot,
    /// Region the detector was restricted to on this frame
    pub region: Option<&'a NormBox>,
    /// Downscaled crop of the active region, when enabled and the frame has pixels
    pub preview: Option<&'a RgbImage>,
    /// This frame's detections in full-frame coordinates
    pub detections: &'a [Detection],
    /// Make confirmed on this frame
    pub make: Option<&'a MakeEvent>,
}

/// Time window the session covers, for progress reporting
#[derive(Debug, Clone, Copy)]
struct SessionSpan {
    start: f64,
    end: Option<f64>,
}

impl SessionSpan {
    fn new(sampler: &FrameSampler, source_duration: Option<f64>) -> Self {
        let end = match (sampler.end(), source_duration) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Self {
            start: sampler.start(),
            end,
        }
    }

    fn fraction(&self, timestamp: f64) -> f64 {
        match self.end {
            Some(end) if end > self.start => ((timestamp - self.start) / (end - self.start)).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }
}

#[derive(Debug, Default)]
struct Consumed {
    processed: u64,
    failed: u64,
}

/// Run one detection session over `source`
///
/// The engine is reset first; on return its event log holds this session's
/// makes. Fatal detector or decoder failures abort with an error, a
/// cancelled session returns normally with `SessionStatus::Cancelled`.
pub fn detect_makes<S, D, F>(
    source: &mut S,
    detector: &mut D,
    engine: &mut ShotRuleEngine,
    settings: &PipelineSettings,
    budget: &ExecutionBudget,
    cancel: &CancelToken,
    mut on_progress: F,
) -> Result<SessionReport, SessionError>
where
    S: FrameSource + ?Sized,
    D: Detector + ?Sized,
    F: FnMut(&Progress<'_>),
{
    let fps = budget.effective_fps(settings.target_fps, settings.constrained_max_fps);
    let sampler = FrameSampler::new(fps, settings.start_offset, settings.max_duration);
    let span = SessionSpan::new(&sampler, source.duration());

    engine.reset();
    tracing::info!(
        detector = detector.name(),
        "Starting detection session: {:.1} fps from {:.2}s{}",
        fps,
        sampler.start(),
        match sampler.end() {
            Some(end) => format!(" to {:.2}s", end),
            None => String::new(),
        }
    );

    let (tx, rx) = bounded(DECODE_AHEAD);
    let decode_cancel = cancel.clone();
    let mut stats = LatencyStats::new();

    let (outcome, decoded) = std::thread::scope(|scope| {
        let decoder = scope.spawn(move || decode_frames(source, sampler, &decode_cancel, tx));
        let outcome = consume_frames(rx, detector, engine, settings, cancel, span, &mut stats, &mut on_progress);
        (outcome, decoder.join())
    });

    engine.flush_diagnostics();
    stats.log_report();

    let consumed = outcome?;
    let decoded = decoded.map_err(|_| SessionError::DecoderPanicked)?;

    let status = if cancel.is_cancelled() {
        SessionStatus::Cancelled
    } else {
        SessionStatus::Completed
    };
    let report = SessionReport {
        events: engine.detected_makes().to_vec(),
        frames_processed: consumed.processed,
        frames_failed: consumed.failed,
        status,
        effective_fps: fps,
    };

    tracing::info!(
        "Detection session {:?}: {} makes, {} frames analysed ({} decoded, {} failed)",
        report.status,
        report.events.len(),
        report.frames_processed,
        decoded,
        report.frames_failed
    );
    Ok(report)
}

/// Decoder thread: sub-sample the source into the channel; returns the count of decoded frames
fn decode_frames<S>(
    source: &mut S,
    mut sampler: FrameSampler,
    cancel: &CancelToken,
    tx: Sender<Result<Frame, SourceError>>,
) -> u64
where
    S: FrameSource + ?Sized,
{
    let mut decoded = 0;
    while !cancel.is_cancelled() {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                // The consumer reports it in order
                let _ = tx.send(Err(e));
                break;
            }
        };
        decoded += 1;

        match sampler.decide(frame.timestamp) {
            SampleDecision::Skip => continue,
            SampleDecision::Finished => break,
            SampleDecision::Take => {
                if tx.send(Ok(frame)).is_err() {
                    // Consumer stopped
                    break;
                }
            }
        }
    }
    decoded
}

#[allow(clippy::too_many_arguments)]
fn consume_frames<D, F>(
    rx: Receiver<Result<Frame, SourceError>>,
    detector: &mut D,
    engine: &mut ShotRuleEngine,
    settings: &PipelineSettings,
    cancel: &CancelToken,
    span: SessionSpan,
    stats: &mut LatencyStats,
    on_progress: &mut F,
) -> Result<Consumed, SessionError>
where
    D: Detector + ?Sized,
    F: FnMut(&Progress<'_>),
{
    let mut consumed = Consumed::default();
    let mut region = RegionTracker::new(settings);

    for message in rx {
        if cancel.is_cancelled() {
            tracing::info!("Detection session cancelled after {} frames", consumed.processed);
            break;
        }
        let frame = message?;
        let started = Instant::now();

        let frame_region = region.active().copied();
        let raw = match detector.detect(&frame, frame_region.as_ref()) {
            Ok(detections) => detections,
            Err(e) if e.is_fatal() => {
                tracing::error!("Detector {} unavailable: {}", detector.name(), e);
                return Err(e.into());
            }
            Err(e) => {
                tracing::warn!(
                    "Detector failed on frame {} ({:.3}s), continuing without detections: {}",
                    frame.index,
                    frame.timestamp,
                    e
                );
                consumed.failed += 1;
                Vec::new()
            }
        };
        let detected = Instant::now();

        let detections = to_frame_coordinates(raw, frame_region.as_ref(), frame.timestamp);
        let make = engine.consume_frame(frame.timestamp, &detections);
        let decided = Instant::now();
        consumed.processed += 1;
        region.update(&detections, engine.hoop_box().as_ref());

        let preview = match (&frame.image, settings.emit_preview) {
            (Some(image), true) => Some(preview_crop(image, frame_region.as_ref(), settings.preview_max_side)),
            _ => None,
        };

        on_progress(&Progress {
            fraction: span.fraction(frame.timestamp),
            timestamp: frame.timestamp,
            snapshot: engine.debug_snapshot(),
            region: frame_region.as_ref(),
            preview: preview.as_ref(),
            detections: &detections,
            make: make.as_ref(),
        });

        stats.add(FrameTiming {
            detect_us: (detected - started).as_secs_f64() * 1e6,
            engine_us: (decided - detected).as_secs_f64() * 1e6,
            total_us: started.elapsed().as_secs_f64() * 1e6,
        });
    }

    Ok(consumed)
}

/// Map region-relative detector output into full-frame coordinates stamped with the frame time
fn to_frame_coordinates(mut detections: Vec<Detection>, region: Option<&NormBox>, timestamp: f64) -> Vec<Detection> {
    for detection in &mut detections {
        if let Some(region) = region {
            detection.bbox = to_global(&detection.bbox, region);
        }
        detection.timestamp = timestamp;
    }
    detections
}

/// Crop `region` out of `image` and shrink it so its longest side is at most `max_side`
pub fn preview_crop(image: &RgbImage, region: Option<&NormBox>, max_side: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let area = region.map(clamp).unwrap_or_else(NormBox::unit);
    let x = ((area.x * width as f32).floor() as u32).min(width - 1);
    let y = ((area.y * height as f32).floor() as u32).min(height - 1);
    let crop_w = ((area.width * width as f32).ceil() as u32).clamp(1, width - x);
    let crop_h = ((area.height * height as f32).ceil() as u32).clamp(1, height - y);

    let crop = imageops::crop_imm(image, x, y, crop_w, crop_h).to_image();

    let longest = crop_w.max(crop_h);
    if longest <= max_side.max(1) {
        return crop;
    }
    let scale = max_side.max(1) as f32 / longest as f32;
    let target_w = ((crop_w as f32 * scale).round() as u32).max(1);
    let target_h = ((crop_h as f32 * scale).round() as u32).max(1);
    imageops::thumbnail(&crop, target_w, target_h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Label;

    #[test]
    fn test_span_fraction() {
        let sampler = FrameSampler::new(10.0, 2.0, Some(4.0));
        let span = SessionSpan::new(&sampler, Some(100.0));
        assert!((span.fraction(4.0) - 0.5).abs() < 1e-9);
        assert_eq!(span.fraction(1.0), 0.0);
        assert_eq!(span.fraction(50.0), 1.0);

        let open = SessionSpan::new(&FrameSampler::new(10.0, 0.0, None), None);
        assert_eq!(open.fraction(3.0), 0.0);
    }

    #[test]
    fn test_frame_coordinates_follow_region() {
        let region = NormBox::new(0.5, 0.5, 0.5, 0.5);
        let detections = vec![Detection::ball(0.9, NormBox::new(0.0, 0.0, 0.2, 0.2), 0.0)];

        let mapped = to_frame_coordinates(detections, Some(&region), 3.0);
        assert_eq!(mapped[0].label, Label::Ball);
        assert!((mapped[0].bbox.x - 0.5).abs() < 1e-6);
        assert!((mapped[0].bbox.width - 0.1).abs() < 1e-6);
        assert_eq!(mapped[0].timestamp, 3.0);
    }

    #[test]
    fn test_preview_crop_downscales_region() {
        let image = RgbImage::new(400, 200);
        let region = NormBox::new(0.25, 0.0, 0.5, 1.0);

        let preview = preview_crop(&image, Some(&region), 100);
        assert_eq!(preview.dimensions(), (100, 100));

        let full = preview_crop(&image, None, 1000);
        assert_eq!(full.dimensions(), (400, 200));
    }

    #[test]
    fn test_cancelled_report_converts_to_error() {
        let report = SessionReport {
            events: Vec::new(),
            frames_processed: 3,
            frames_failed: 0,
            status: SessionStatus::Cancelled,
            effective_fps: 12.0,
        };
        assert!(report.is_cancelled());
        assert!(matches!(report.completed(), Err(SessionError::Cancelled)));
    }
}
