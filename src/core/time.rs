//! Frame clock
//!
//! Measures the wall-clock delta that drives the frame loop and keeps a
//! rolling history for FPS reporting. The clock can also be advanced by a
//! fixed delta, which is how the headless driver and tests step a session
//! deterministically.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Longest window kept in the frame history, in seconds
const HISTORY_SECS: f64 = 15.0;

/// FPS statistics for a time window
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct FpsWindow {
    pub avg: f32,
    pub min: f32,
    pub max: f32,
}

/// Rolling FPS statistics over multiple time windows
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct FpsStats {
    pub one_sec: FpsWindow,
    pub five_sec: FpsWindow,
    pub fifteen_sec: FpsWindow,
    pub current_fps: f32,
    pub frame_count: u64,
}

/// Tracks frame deltas on a session timeline
pub struct FrameClock {
    last_instant: Instant,
    /// Seconds since the clock was created, on the simulated timeline
    elapsed: f64,
    delta: f32,
    frame_count: u64,
    /// (timeline seconds, frame time) pairs, oldest first
    history: VecDeque<(f64, f32)>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last_instant: Instant::now(),
            elapsed: 0.0,
            delta: 0.0,
            frame_count: 0,
            history: VecDeque::new(),
        }
    }

    /// Measure the wall-clock time since the previous tick and return it in seconds
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let delta = now - self.last_instant;
        self.last_instant = now;
        self.record(delta)
    }

    /// Advance by a fixed delta instead of reading the wall clock
    pub fn advance(&mut self, delta: Duration) -> f32 {
        self.last_instant = Instant::now();
        self.record(delta)
    }

    fn record(&mut self, delta: Duration) -> f32 {
        self.delta = delta.as_secs_f32();
        self.elapsed += delta.as_secs_f64();
        self.frame_count += 1;
        self.history.push_back((self.elapsed, self.delta));

        let cutoff = self.elapsed - HISTORY_SECS;
        while self.history.front().is_some_and(|&(t, _)| t < cutoff) {
            self.history.pop_front();
        }

        self.delta
    }

    /// Delta of the most recent frame in seconds
    pub fn delta_secs(&self) -> f32 {
        self.delta
    }

    /// Seconds elapsed on the session timeline
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Rolling FPS statistics over 1s, 5s and 15s windows
    pub fn fps_stats(&self) -> FpsStats {
        let one_sec = self.window_stats(1.0);
        FpsStats {
            one_sec,
            five_sec: self.window_stats(5.0),
            fifteen_sec: self.window_stats(HISTORY_SECS),
            current_fps: one_sec.avg,
            frame_count: self.frame_count,
        }
    }

    fn window_stats(&self, window: f64) -> FpsWindow {
        let cutoff = self.elapsed - window;
        let mut frames = 0u32;
        let mut total = 0.0f32;
        let mut min_fps = f32::INFINITY;
        let mut max_fps = 0.0f32;

        for &(_, frame_time) in self.history.iter().filter(|(t, _)| *t >= cutoff) {
            frames += 1;
            total += frame_time;
            let fps = if frame_time > 0.0 { 1.0 / frame_time } else { 0.0 };
            min_fps = min_fps.min(fps);
            max_fps = max_fps.max(fps);
        }

        if frames == 0 {
            return FpsWindow::default();
        }

        FpsWindow {
            avg: if total > 0.0 { frames as f32 / total } else { 0.0 },
            min: min_fps,
            max: max_fps,
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
