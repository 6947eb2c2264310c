use std::collections::VecDeque;

/// Cooldown gate on the media timeline
///
/// Works on frame timestamps (seconds) instead of wall-clock time so that
/// replays and faster-than-real-time processing behave identically.
#[derive(Debug, Clone)]
pub struct Cooldown {
    last_trigger: Option<f64>,
    duration: f64,
}

impl Cooldown {
    /// Create a new cooldown lasting `duration` seconds
    pub fn new(duration: f64) -> Self {
        Self {
            last_trigger: None,
            duration,
        }
    }

    /// Mark `now` as the start of a new cooldown period
    pub fn trigger(&mut self, now: f64) {
        self.last_trigger = Some(now);
    }

    /// Seconds left before the gate opens again (0 when clear)
    pub fn remaining(&self, now: f64) -> f64 {
        match self.last_trigger {
            None => 0.0,
            Some(last) => (self.duration - (now - last)).max(0.0),
        }
    }

    pub fn is_clear(&self, now: f64) -> bool {
        self.remaining(now) <= 0.0
    }

    /// Reset the cooldown
    pub fn reset(&mut self) {
        self.last_trigger = None;
    }
}

/// Timing measurements for a single processed frame
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameTiming {
    pub detect_us: f64,
    pub engine_us: f64,
    pub total_us: f64,
}

/// Most recent frames kept for percentiles
pub const MAX_SAMPLES: usize = 4096;

/// Statistics collector for per-frame latency measurements
///
/// Means cover every frame; percentiles cover the last `MAX_SAMPLES`.
#[derive(Debug, Default)]
pub struct LatencyStats {
    recent: VecDeque<FrameTiming>,
    frames: u64,
    sums: FrameTiming,
}

/// Mean and percentiles of one stage, in microseconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSummary {
    pub mean: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

impl LatencyStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, timing: FrameTiming) {
        if self.recent.len() == MAX_SAMPLES {
            self.recent.pop_front();
        }
        self.recent.push_back(timing);

        self.frames += 1;
        self.sums.detect_us += timing.detect_us;
        self.sums.engine_us += timing.engine_us;
        self.sums.total_us += timing.total_us;
    }

    /// Frames recorded so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Frames currently held for percentiles
    pub fn retained(&self) -> usize {
        self.recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    /// Calculate percentile from sorted data
    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }

        let idx = (p / 100.0 * (sorted.len() - 1) as f64).round() as usize;
        sorted[idx]
    }

    /// Calculate statistics for a specific stage
    pub fn stage(&self, extract: impl Fn(&FrameTiming) -> f64) -> StageSummary {
        if self.recent.is_empty() {
            return StageSummary {
                mean: 0.0,
                p50: 0.0,
                p95: 0.0,
                p99: 0.0,
            };
        }

        let mut values: Vec<f64> = self.recent.iter().map(&extract).collect();
        values.sort_by(|a, b| a.total_cmp(b));

        StageSummary {
            mean: extract(&self.sums) / self.frames as f64,
            p50: Self::percentile(&values, 50.0),
            p95: Self::percentile(&values, 95.0),
            p99: Self::percentile(&values, 99.0),
        }
    }

    /// Log a per-stage latency report
    pub fn log_report(&self) {
        if self.is_empty() {
            tracing::debug!("No timing data collected");
            return;
        }

        for (name, summary) in [
            ("detect", self.stage(|t| t.detect_us)),
            ("engine", self.stage(|t| t.engine_us)),
            ("total", self.stage(|t| t.total_us)),
        ] {
            tracing::info!(
                frames = self.frames,
                "{:<6} mean {:>8.0} µs | p50 {:>8.0} µs | p95 {:>8.0} µs | p99 {:>8.0} µs",
                name,
                summary.mean,
                summary.p50,
                summary.p95,
                summary.p99
            );
        }
    }
}
