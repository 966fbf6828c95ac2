use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub realtick_hz: f32,
    pub frame_time_ms: f32,
}

/// Rolling per-interval counters for the platform loop.
#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Instant,
    interval: Duration,
    frames: u32,
    realticks: u32,
    frame_time_sum: Duration,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval_start: now,
            interval,
            frames: 0,
            realticks: 0,
            frame_time_sum: Duration::ZERO,
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration, realtick: bool) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time_sum = self.frame_time_sum.saturating_add(frame_dt);
        if realtick {
            self.realticks = self.realticks.saturating_add(1);
        }
    }

    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = if self.frames == 0 {
            0.0
        } else {
            (self.frame_time_sum.as_secs_f32() / self.frames as f32) * 1000.0
        };

        let snapshot = LoopMetricsSnapshot {
            fps: self.frames as f32 / elapsed_seconds,
            realtick_hz: self.realticks as f32 / elapsed_seconds,
            frame_time_ms,
        };

        self.interval_start = now;
        self.frames = 0;
        self.realticks = 0;
        self.frame_time_sum = Duration::ZERO;

        Some(snapshot)
    }
}

/// Whole-run counters kept by the director.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunStats {
    pub ticks: u64,
    pub realticks: u64,
    pub secs: f64,
}

impl RunStats {
    pub fn realtick_rate(&self) -> f64 {
        if self.secs <= 0.0 {
            0.0
        } else {
            self.realticks as f64 / self.secs
        }
    }

    pub fn frame_rate(&self) -> f64 {
        if self.secs <= 0.0 {
            0.0
        } else {
            self.ticks as f64 / self.secs
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_computes_expected_values() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1), base);

        accumulator.record_frame(Duration::from_millis(16), true);
        accumulator.record_frame(Duration::from_millis(16), false);
        accumulator.record_frame(Duration::from_millis(16), true);
        accumulator.record_frame(Duration::from_millis(16), true);

        let snapshot = accumulator
            .maybe_snapshot(base + Duration::from_secs(1))
            .expect("snapshot should be emitted");

        assert!((snapshot.fps - 4.0).abs() < 0.05);
        assert!((snapshot.realtick_hz - 3.0).abs() < 0.05);
        assert!((snapshot.frame_time_ms - 16.0).abs() < 0.001);
    }

    #[test]
    fn snapshot_not_emitted_before_interval() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1), base);
        accumulator.record_frame(Duration::from_millis(16), true);

        assert!(accumulator
            .maybe_snapshot(base + Duration::from_millis(500))
            .is_none());
    }

    #[test]
    fn run_stats_rates_handle_zero_time() {
        let stats = RunStats::default();
        assert_eq!(stats.realtick_rate(), 0.0);
        let stats = RunStats {
            ticks: 120,
            realticks: 80,
            secs: 2.0,
        };
        assert_eq!(stats.realtick_rate(), 40.0);
        assert_eq!(stats.frame_rate(), 60.0);
    }
}
