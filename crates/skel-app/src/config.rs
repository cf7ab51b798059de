//! Application configuration.

use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Window title, also used as the Vulkan application name.
    pub title: String,
    /// Initial window width.
    pub width: u32,
    /// Initial window height.
    pub height: u32,
    /// Target frames per second (None for unlimited).
    pub target_fps: Option<u32>,
    /// Enable vsync.
    pub vsync: bool,
    /// Enable Vulkan validation layers (default: debug builds only).
    pub validation: bool,
    /// Log info and verbose validation messages too.
    pub verbose_validation: bool,
    /// Frames the CPU may record ahead of the GPU.
    pub frames_in_flight: usize,
    /// Colour the render pass clears to.
    pub clear_color: [f32; 4],
    /// Give the render pass a depth attachment.
    pub depth: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Skel".to_string(),
            width: 1600,
            height: 900,
            target_fps: None,
            vsync: false,
            validation: cfg!(debug_assertions),
            verbose_validation: false,
            frames_in_flight: 2,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            depth: false,
        }
    }
}

impl AppConfig {
    /// Create a new config with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the window dimensions.
    #[must_use]
    pub const fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the target FPS. Zero means unlimited.
    #[must_use]
    pub const fn with_target_fps(mut self, fps: u32) -> Self {
        self.target_fps = if fps == 0 { None } else { Some(fps) };
        self
    }

    /// Enable or disable vsync.
    #[must_use]
    pub const fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Enable or disable validation layers.
    #[must_use]
    pub const fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    /// Route info and verbose validation messages to the log.
    #[must_use]
    pub const fn with_verbose_validation(mut self, verbose: bool) -> Self {
        self.verbose_validation = verbose;
        self
    }

    /// Set how many frames may be in flight.
    #[must_use]
    pub const fn with_frames_in_flight(mut self, frames: usize) -> Self {
        self.frames_in_flight = frames;
        self
    }

    /// Set the clear colour (RGB, opaque).
    #[must_use]
    pub const fn with_clear_color(mut self, r: f32, g: f32, b: f32) -> Self {
        self.clear_color = [r, g, b, 1.0];
        self
    }

    /// Add a depth attachment to the render pass.
    #[must_use]
    pub const fn with_depth(mut self, depth: bool) -> Self {
        self.depth = depth;
        self
    }

    /// Minimum time per frame for the target FPS.
    pub fn target_frame_time(&self) -> Option<Duration> {
        self.target_fps
            .filter(|&fps| fps > 0)
            .map(|fps| Duration::from_nanos(1_000_000_000 / u64::from(fps)))
    }
}

/// How long to sleep after a frame that took `elapsed` to hit `target`.
pub(crate) fn pacing_delay(target: Option<Duration>, elapsed: Duration) -> Option<Duration> {
    target
        .and_then(|target| target.checked_sub(elapsed))
        .filter(|delay| !delay.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!((config.width, config.height), (1600, 900));
        assert_eq!(config.frames_in_flight, 2);
        assert!(!config.vsync);
        assert!(!config.depth);
        assert_eq!(config.target_frame_time(), None);
    }

    #[test]
    fn builder_sets_fields() {
        let config = AppConfig::new("mesh")
            .with_size(800, 600)
            .with_vsync(true)
            .with_clear_color(0.0, 0.2, 1.0)
            .with_depth(true)
            .with_frames_in_flight(3);
        assert_eq!(config.title, "mesh");
        assert_eq!((config.width, config.height), (800, 600));
        assert!(config.vsync);
        assert_eq!(config.clear_color, [0.0, 0.2, 1.0, 1.0]);
        assert!(config.depth);
        assert_eq!(config.frames_in_flight, 3);
    }

    #[test]
    fn target_frame_time_from_fps() {
        let config = AppConfig::default().with_target_fps(50);
        assert_eq!(config.target_frame_time(), Some(Duration::from_millis(20)));
        assert_eq!(AppConfig::default().with_target_fps(0).target_fps, None);
    }

    #[test]
    fn pacing_only_sleeps_when_early() {
        let target = Some(Duration::from_millis(16));
        assert_eq!(
            pacing_delay(target, Duration::from_millis(10)),
            Some(Duration::from_millis(6))
        );
        assert_eq!(pacing_delay(target, Duration::from_millis(16)), None);
        assert_eq!(pacing_delay(target, Duration::from_millis(30)), None);
        assert_eq!(pacing_delay(None, Duration::ZERO), None);
    }
}
