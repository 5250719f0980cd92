use std::time::{Duration, Instant};

/// Longest spacing a clock accepts; slower rates are clamped to it.
pub const MAX_FRAME_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Minimum spacing between feedback steps plus the time of the last one.
#[derive(Debug, Clone, Copy)]
pub struct PacingClock {
    min_interval: Duration,
    last_tick: Option<Instant>,
}

impl PacingClock {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval: min_interval.min(MAX_FRAME_INTERVAL),
            last_tick: None,
        }
    }

    /// A non-positive or non-finite rate leaves stepping uncapped.
    pub fn from_fps(fps: f32) -> Self {
        if !fps.is_finite() || fps <= 0.0 {
            return Self::new(Duration::ZERO);
        }
        let interval =
            Duration::try_from_secs_f64(1.0 / f64::from(fps)).unwrap_or(MAX_FRAME_INTERVAL);
        Self::new(interval)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_tick {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
        }
    }

    pub fn record(&mut self, now: Instant) {
        self.last_tick = Some(now);
    }

    /// `None` means the next tick is due immediately.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.last_tick.and_then(|last| last.checked_add(self.min_interval))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_is_always_due() {
        let clock = PacingClock::from_fps(30.0);
        assert!(clock.is_due(Instant::now()));
        assert_eq!(clock.next_deadline(), None);
    }

    #[test]
    fn respects_minimum_interval() {
        let mut clock = PacingClock::new(Duration::from_millis(33));
        let start = Instant::now();
        clock.record(start);
        assert!(!clock.is_due(start + Duration::from_millis(10)));
        assert!(clock.is_due(start + Duration::from_millis(33)));
        assert_eq!(clock.next_deadline(), Some(start + Duration::from_millis(33)));
    }

    #[test]
    fn invalid_rates_are_uncapped() {
        assert_eq!(PacingClock::from_fps(0.0).min_interval(), Duration::ZERO);
        assert_eq!(PacingClock::from_fps(-5.0).min_interval(), Duration::ZERO);
        assert_eq!(PacingClock::from_fps(f32::NAN).min_interval(), Duration::ZERO);
    }

    #[test]
    fn tiny_rates_clamp_to_max_interval() {
        assert_eq!(PacingClock::from_fps(1e-40).min_interval(), MAX_FRAME_INTERVAL);
        assert_eq!(
            PacingClock::from_fps(f32::MIN_POSITIVE).min_interval(),
            MAX_FRAME_INTERVAL
        );
        assert_eq!(
            PacingClock::new(Duration::from_secs(u64::MAX)).min_interval(),
            MAX_FRAME_INTERVAL
        );
    }

    #[test]
    fn long_interval_deadline_does_not_overflow() {
        let mut clock = PacingClock::new(Duration::MAX);
        let start = Instant::now();
        clock.record(start);
        assert_eq!(clock.next_deadline(), Some(start + MAX_FRAME_INTERVAL));
        assert!(!clock.is_due(start + Duration::from_secs(1)));
    }

    #[test]
    fn derives_interval_from_rate() {
        let clock = PacingClock::from_fps(25.0);
        assert_eq!(clock.min_interval(), Duration::from_millis(40));
    }
}
