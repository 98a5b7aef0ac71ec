//! Frame-driven interval timer

/// Accumulates frame time and reports when an interval has elapsed.
///
/// The timer does not restart on its own; callers restart it once the work
/// it gates has actually been done, so a skipped attempt is retried on the
/// next frame.
#[derive(Debug, Clone, Default)]
pub struct IntervalTimer {
    elapsed: f32,
}

impl IntervalTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, dt: f32) {
        self.elapsed += dt.max(0.0);
    }

    pub fn is_due(&self, interval: f32) -> bool {
        self.elapsed >= interval
    }

    pub fn restart(&mut self) {
        self.elapsed = 0.0;
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_due_after_interval() {
        let mut timer = IntervalTimer::new();
        timer.advance(0.1);
        assert!(!timer.is_due(0.25));
        timer.advance(0.2);
        assert!(timer.is_due(0.25));
        timer.restart();
        assert!(!timer.is_due(0.25));
    }

    #[test]
    fn test_negative_dt_ignored() {
        let mut timer = IntervalTimer::new();
        timer.advance(-1.0);
        assert_eq!(timer.elapsed(), 0.0);
    }
}
