use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Compteur FPS par fenêtre glissante. Zéro allocation après init.
///
/// # Example
/// ```
/// use cc_render::fps::FpsCounter;
/// let mut counter = FpsCounter::new(30);
/// counter.tick();
/// assert!(counter.fps() >= 0.0);
/// ```
pub struct FpsCounter {
    /// Timestamps des dernières frames.
    timestamps: VecDeque<Instant>,
    window: usize,
    fps: f64,
    last_frame: Duration,
}

impl FpsCounter {
    /// Counter averaging over the last `window` frames (minimum 2).
    #[must_use]
    pub fn new(window: usize) -> Self {
        let window = window.max(2);
        Self {
            timestamps: VecDeque::with_capacity(window + 1),
            window,
            fps: 0.0,
            last_frame: Duration::ZERO,
        }
    }

    /// Appeler une fois par frame, APRÈS le rendu.
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    fn tick_at(&mut self, now: Instant) {
        if let Some(&last) = self.timestamps.back() {
            self.last_frame = now.saturating_duration_since(last);
        }
        self.timestamps.push_back(now);
        if self.timestamps.len() > self.window {
            self.timestamps.pop_front();
        }
        if let Some(&first) = self.timestamps.front() {
            let secs = now.saturating_duration_since(first).as_secs_f64();
            if secs > 0.0 {
                self.fps = (self.timestamps.len() - 1) as f64 / secs;
            }
        }
    }

    /// FPS moyen sur la fenêtre.
    #[must_use]
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Durée de la dernière frame, en ms.
    #[must_use]
    pub fn frame_time_ms(&self) -> f64 {
        self.last_frame.as_secs_f64() * 1000.0
    }

    pub fn reset(&mut self) {
        self.timestamps.clear();
        self.fps = 0.0;
        self.last_frame = Duration::ZERO;
    }
}

/// Time budget of one frame at `target_fps`.
///
/// # Example
/// ```
/// use cc_render::fps::frame_budget;
/// assert_eq!(frame_budget(50).as_millis(), 20);
/// ```
#[must_use]
pub fn frame_budget(target_fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(target_fps.max(1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_ticks_give_expected_rate() {
        let mut counter = FpsCounter::new(10);
        let start = Instant::now();
        for i in 0..20u64 {
            counter.tick_at(start + Duration::from_millis(i * 40));
        }
        assert!((counter.fps() - 25.0).abs() < 0.01, "{}", counter.fps());
        assert!((counter.frame_time_ms() - 40.0).abs() < 0.01);
    }

    #[test]
    fn single_tick_has_no_rate() {
        let mut counter = FpsCounter::new(10);
        counter.tick();
        assert!(counter.fps().abs() < f64::EPSILON);
        counter.reset();
        assert!(counter.frame_time_ms().abs() < f64::EPSILON);
    }
}
