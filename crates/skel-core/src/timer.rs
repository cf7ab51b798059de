//! Wall-clock timing and frame statistics.

use std::time::{Duration, Instant};

/// A restartable stopwatch.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    timestamp: Instant,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Start a timer at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            timestamp: Instant::now(),
        }
    }

    /// Record a new reference timestamp.
    pub fn record(&mut self) {
        self.timestamp = Instant::now();
    }

    /// Time since creation or the last call to [`Timer::record`].
    #[must_use]
    pub fn elapsed_duration(&self) -> Duration {
        self.timestamp.elapsed()
    }

    /// Elapsed seconds since creation or the last call to [`Timer::record`].
    #[must_use]
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_duration().as_secs_f64()
    }

    /// Elapsed milliseconds since creation or the last call to [`Timer::record`].
    #[must_use]
    pub fn elapsed_milliseconds(&self) -> f64 {
        self.elapsed_seconds() * 1000.0
    }

    /// Alias for [`Timer::elapsed_milliseconds`].
    #[must_use]
    pub fn elapsed(&self) -> f64 {
        self.elapsed_milliseconds()
    }

    /// Restart the timer and return the time that elapsed before the restart.
    pub fn lap(&mut self) -> Duration {
        let now = Instant::now();
        let dt = now.duration_since(self.timestamp);
        self.timestamp = now;
        dt
    }
}

/// Running frame-rate statistics.
#[derive(Debug, Clone)]
pub struct FrameStats {
    min_fps: f64,
    max_fps: f64,
    fps_sum: f64,
    samples: u64,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self {
            min_fps: f64::MAX,
            max_fps: 0.0,
            fps_sum: 0.0,
            samples: 0,
        }
    }
}

impl FrameStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a frame that took `dt` seconds. Returns the instantaneous FPS.
    ///
    /// Zero or negative deltas are ignored and report 0 FPS.
    pub fn record(&mut self, dt: f32) -> f32 {
        if dt <= 0.0 {
            return 0.0;
        }
        let fps = 1.0 / f64::from(dt);
        self.min_fps = self.min_fps.min(fps);
        self.max_fps = self.max_fps.max(fps);
        self.fps_sum += fps;
        self.samples += 1;
        #[allow(clippy::cast_possible_truncation)]
        let fps = fps as f32;
        fps
    }

    /// Number of frames recorded.
    #[must_use]
    pub const fn samples(&self) -> u64 {
        self.samples
    }

    /// Lowest FPS seen, if any frame was recorded.
    #[must_use]
    pub fn min_fps(&self) -> Option<f64> {
        (self.samples > 0).then_some(self.min_fps)
    }

    /// Highest FPS seen, if any frame was recorded.
    #[must_use]
    pub fn max_fps(&self) -> Option<f64> {
        (self.samples > 0).then_some(self.max_fps)
    }

    /// Mean FPS, if any frame was recorded.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_fps(&self) -> Option<f64> {
        (self.samples > 0).then(|| self.fps_sum / self.samples as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn timer_measures_forward() {
        let mut timer = Timer::new();
        std::thread::sleep(Duration::from_millis(5));
        assert!(timer.elapsed_milliseconds() >= 5.0);
        assert_relative_eq!(
            timer.elapsed(),
            timer.elapsed_milliseconds(),
            epsilon = 1.0
        );

        timer.record();
        assert!(timer.elapsed_seconds() < 1.0);
    }

    #[test]
    fn lap_restarts() {
        let mut timer = Timer::new();
        std::thread::sleep(Duration::from_millis(2));
        let first = timer.lap();
        assert!(first >= Duration::from_millis(2));
        assert!(timer.elapsed_duration() < first + Duration::from_secs(1));
    }

    #[test]
    fn empty_stats() {
        let stats = FrameStats::new();
        assert_eq!(stats.samples(), 0);
        assert!(stats.min_fps().is_none());
        assert!(stats.avg_fps().is_none());
    }

    #[test]
    fn stats_track_min_max_avg() {
        let mut stats = FrameStats::new();
        assert_relative_eq!(stats.record(0.5), 2.0);
        assert_relative_eq!(stats.record(0.25), 4.0);
        assert_relative_eq!(stats.record(0.0), 0.0);

        assert_eq!(stats.samples(), 2);
        assert_relative_eq!(stats.min_fps().unwrap(), 2.0);
        assert_relative_eq!(stats.max_fps().unwrap(), 4.0);
        assert_relative_eq!(stats.avg_fps().unwrap(), 3.0);
    }
}
