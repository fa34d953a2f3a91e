//! Time management utilities

use std::time::Instant;

use crate::core::config::TimeConfig;

/// Frame clock driven by [`Scene::update`](crate::ecs::Scene::update)
///
/// Each update advances the frame counter by one and recomputes the delta
/// since the previous update. The delta is scaled, then clamped to the
/// configured bounds so a hitch or a paused debugger never produces a huge
/// step. FPS is resampled once per sample window.
pub struct Time {
    start: Instant,
    current: f64,
    fps: f64,
    delta: f64,
    frame: u64,

    scale: f64,
    fixed_delta: f64,
    fixed_delta_unscaled: f64,

    fps_frame: u64,
    fps_last_time: f64,

    min_delta: f64,
    max_delta: f64,
    fps_sample_interval: f64,
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

impl Time {
    /// Create a clock with default settings
    pub fn new() -> Self {
        Self::with_config(&TimeConfig::default())
    }

    /// Create a clock from configuration
    pub fn with_config(config: &TimeConfig) -> Self {
        Self {
            start: Instant::now(),
            current: 0.0,
            fps: config.initial_fps,
            delta: config.fixed_delta * config.scale,
            frame: 0,
            scale: config.scale,
            fixed_delta: config.fixed_delta * config.scale,
            fixed_delta_unscaled: config.fixed_delta,
            fps_frame: 0,
            fps_last_time: 0.0,
            min_delta: config.min_delta,
            max_delta: config.max_delta,
            fps_sample_interval: config.fps_sample_interval,
        }
    }

    /// Seconds since the last update, scaled and clamped
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Seconds since clock creation, as of the last update
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Frames per second, averaged over the last sample window
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Number of updates so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Time scale
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Set the time scale; also rescales the fixed step
    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
        self.fixed_delta = self.fixed_delta_unscaled * scale;
    }

    /// Fixed step, scaled
    pub fn fixed_delta(&self) -> f64 {
        self.fixed_delta
    }

    /// Set the unscaled fixed step
    pub fn set_fixed_delta(&mut self, fixed_delta: f64) {
        self.fixed_delta_unscaled = fixed_delta;
        self.fixed_delta = fixed_delta * self.scale;
    }

    /// Delta clamp bounds as `(min, max)`
    pub fn delta_bounds(&self) -> (f64, f64) {
        (self.min_delta, self.max_delta)
    }

    /// Instant the clock was created
    pub fn start(&self) -> Instant {
        self.start
    }

    /// Seconds elapsed since the clock was created
    pub fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Update the clock (should be called once per frame)
    pub fn update(&mut self) {
        let now = self.now();
        self.tick(now);
    }

    /// Advance the clock to `now` seconds since creation
    ///
    /// [`update`](Self::update) reads the wall clock and forwards here;
    /// calling it directly gives deterministic stepping.
    pub fn tick(&mut self, now: f64) {
        self.frame += 1;

        let last = self.current;

        self.fps_frame += 1;
        if self.fps_last_time + self.fps_sample_interval < now {
            #[allow(clippy::cast_precision_loss)]
            let frames = self.fps_frame as f64;
            self.fps = frames / (now - self.fps_last_time);
            self.fps_last_time = now;
            self.fps_frame = 0;
        }

        let delta = (now - last) * self.scale;
        self.delta = delta.max(self.min_delta).min(self.max_delta);

        self.current = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_tick_advances_frame_by_one() {
        let mut time = Time::new();
        time.tick(0.016);
        assert_eq!(time.frame(), 1);
        time.tick(0.032);
        assert_eq!(time.frame(), 2);
        time.update();
        assert_eq!(time.frame(), 3);
    }

    #[test]
    fn test_delta_is_clamped() {
        let mut time = Time::new();
        let (min, max) = time.delta_bounds();

        // No time passed at all
        time.tick(0.0);
        assert_relative_eq!(time.delta(), min);

        // Long stall
        time.tick(30.0);
        assert_relative_eq!(time.delta(), max);

        // Clock going backwards still yields a valid delta
        time.tick(29.0);
        assert_relative_eq!(time.delta(), min);

        time.tick(29.5);
        assert_relative_eq!(time.delta(), 0.5);
    }

    #[test]
    fn test_scale_applies_to_delta_and_fixed_delta() {
        let mut time = Time::new();
        time.set_fixed_delta(0.02);
        time.set_scale(0.5);

        assert_relative_eq!(time.fixed_delta(), 0.01);

        time.tick(0.2);
        assert_relative_eq!(time.delta(), 0.1);

        time.set_fixed_delta(0.1);
        assert_relative_eq!(time.fixed_delta(), 0.05);
    }

    #[test]
    fn test_fps_resampled_after_window() {
        let mut time = Time::new();
        assert_relative_eq!(time.fps(), 60.0);

        for i in 1..=10 {
            time.tick(f64::from(i) * 0.09);
        }
        // 0.9 is not past the window yet
        assert_relative_eq!(time.fps(), 60.0);

        time.tick(1.1);
        assert_relative_eq!(time.fps(), 11.0 / 1.1, epsilon = 1e-9);
    }

    #[test]
    fn test_custom_bounds_from_config() {
        let config = TimeConfig::default().with_delta_bounds(0.01, 0.05);
        let mut time = Time::with_config(&config);

        time.tick(1.0);
        assert_relative_eq!(time.delta(), 0.05);
        time.tick(1.001);
        assert_relative_eq!(time.delta(), 0.01);
    }
}
