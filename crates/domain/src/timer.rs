use chrono::Duration;

/// Elapsed workout time, advanced once per second by the caller's event loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ElapsedTimer {
    seconds: u32,
}

impl ElapsedTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_seconds(seconds: u32) -> Self {
        Self { seconds }
    }

    pub fn tick(&mut self) {
        self.seconds = self.seconds.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.seconds = 0;
    }

    #[must_use]
    pub fn seconds(&self) -> u32 {
        self.seconds
    }

    /// Whole minutes, rounded down.
    #[must_use]
    pub fn minutes(&self) -> u32 {
        self.seconds / 60
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::seconds(i64::from(self.seconds))
    }
}

impl std::fmt::Display for ElapsedTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hours = self.seconds / 3600;
        let minutes = (self.seconds % 3600) / 60;
        let seconds = self.seconds % 60;
        if hours > 0 {
            write!(f, "{hours}:{minutes:02}:{seconds:02}")
        } else {
            write!(f, "{minutes:02}:{seconds:02}")
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn timer(seconds: u32) -> ElapsedTimer {
        ElapsedTimer::from_seconds(seconds)
    }

    #[test]
    fn test_tick() {
        let mut timer = ElapsedTimer::new();
        for _ in 0..61 {
            timer.tick();
        }
        assert_eq!(timer.seconds(), 61);
        assert_eq!(timer.minutes(), 1);
        assert_eq!(timer.duration(), Duration::seconds(61));
        timer.reset();
        assert_eq!(timer.seconds(), 0);
    }

    #[test]
    fn test_tick_saturates() {
        let mut timer = timer(u32::MAX);
        timer.tick();
        assert_eq!(timer.seconds(), u32::MAX);
    }

    #[rstest]
    #[case(0, "00:00")]
    #[case(59, "00:59")]
    #[case(754, "12:34")]
    #[case(3661, "1:01:01")]
    fn test_display(#[case] seconds: u32, #[case] expected: &str) {
        assert_eq!(timer(seconds).to_string(), expected);
    }
}
