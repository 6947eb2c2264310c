/// Smoothed hoop position
///
/// Exponential smoothing of the hoop box, with a hard reset when the raw
/// center jumps far enough to look like a scene cut or a camera pan.
use serde::Serialize;

use crate::geometry::NormBox;

/// What a hoop observation did to the track
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HoopUpdate {
    /// First observation of the session
    Initialized,
    /// Blended toward the raw box
    Smoothed,
    /// Center jumped by `jump`; the track restarted from the raw box
    Reset { jump: f32 },
}

#[derive(Debug, Clone, Default)]
pub struct HoopTrack {
    smoothed: Option<NormBox>,
    last_reset_time: Option<f64>,
}

impl HoopTrack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn smoothed(&self) -> Option<&NormBox> {
        self.smoothed.as_ref()
    }

    /// Timestamp of the most recent hard reset, if any
    pub fn last_reset_time(&self) -> Option<f64> {
        self.last_reset_time
    }

    pub fn is_locked(&self) -> bool {
        self.smoothed.is_some()
    }

    /// Feed this frame's raw hoop box
    pub fn observe(&mut self, raw: NormBox, timestamp: f64, alpha: f32, jump_threshold: f32) -> HoopUpdate {
        let Some(prev) = self.smoothed else {
            self.smoothed = Some(raw);
            return HoopUpdate::Initialized;
        };

        let jump = prev.center_distance(&raw);
        if jump > jump_threshold {
            self.smoothed = Some(raw);
            self.last_reset_time = Some(timestamp);
            return HoopUpdate::Reset { jump };
        }

        let blend = |old: f32, new: f32| old + alpha * (new - old);
        self.smoothed = Some(NormBox::new(
            blend(prev.x, raw.x),
            blend(prev.y, raw.y),
            blend(prev.width, raw.width),
            blend(prev.height, raw.height),
        ));
        HoopUpdate::Smoothed
    }

    pub fn clear(&mut self) {
        self.smoothed = None;
        self.last_reset_time = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gap(a: &NormBox, b: &NormBox) -> f32 {
        (a.x - b.x).abs() + (a.y - b.y).abs() + (a.width - b.width).abs() + (a.height - b.height).abs()
    }

    #[test]
    fn test_first_observation_initializes() {
        let mut track = HoopTrack::new();
        let raw = NormBox::new(0.4, 0.2, 0.1, 0.06);

        assert_eq!(track.observe(raw, 0.0, 0.5, 0.3), HoopUpdate::Initialized);
        assert_eq!(track.smoothed(), Some(&raw));
        assert!(track.last_reset_time().is_none());
    }

    #[test]
    fn test_ema_blends_halfway() {
        let mut track = HoopTrack::new();
        track.observe(NormBox::new(0.40, 0.20, 0.10, 0.06), 0.0, 0.5, 0.3);
        track.observe(NormBox::new(0.50, 0.30, 0.12, 0.08), 0.1, 0.5, 0.3);

        let s = track.smoothed().unwrap();
        assert!((s.x - 0.45).abs() < 1e-6);
        assert!((s.y - 0.25).abs() < 1e-6);
        assert!((s.width - 0.11).abs() < 1e-6);
        assert!((s.height - 0.07).abs() < 1e-6);
    }

    #[test]
    fn test_ema_converges_monotonically() {
        let mut track = HoopTrack::new();
        track.observe(NormBox::new(0.40, 0.20, 0.10, 0.06), 0.0, 0.5, 0.3);

        let target = NormBox::new(0.52, 0.26, 0.11, 0.07);
        let mut previous = gap(track.smoothed().unwrap(), &target);
        for i in 1..20 {
            let update = track.observe(target, i as f64 * 0.1, 0.5, 0.3);
            assert_eq!(update, HoopUpdate::Smoothed);
            let current = gap(track.smoothed().unwrap(), &target);
            assert!(current <= previous);
            previous = current;
        }
        assert!(previous < 1e-4);
    }

    #[test]
    fn test_large_jump_resets() {
        let mut track = HoopTrack::new();
        track.observe(NormBox::new(0.10, 0.20, 0.10, 0.06), 0.0, 0.5, 0.3);

        let raw = NormBox::new(0.70, 0.20, 0.10, 0.06);
        match track.observe(raw, 3.0, 0.5, 0.3) {
            HoopUpdate::Reset { jump } => assert!((jump - 0.6).abs() < 1e-5),
            other => panic!("Expected reset, got {:?}", other),
        }
        assert_eq!(track.smoothed(), Some(&raw));
        assert_eq!(track.last_reset_time(), Some(3.0));
    }

    #[test]
    fn test_clear() {
        let mut track = HoopTrack::new();
        track.observe(NormBox::new(0.10, 0.20, 0.10, 0.06), 0.0, 0.5, 0.3);
        track.clear();
        assert!(!track.is_locked());
    }
}
