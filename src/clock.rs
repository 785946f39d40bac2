use std::time::{Duration, Instant};

/// Periodic tick driving the snapshot / analyse / publish cycle.
///
/// The clock does not own a thread; the engine loop polls it with the current
/// time and sleeps for [`NotificationClock::time_until_next`] in between.
pub struct NotificationClock {
    frame_rate: u32,
    interval: Duration,
    next_tick: Option<Instant>,
}

impl NotificationClock {
    pub fn new(frame_rate: u32) -> Self {
        Self {
            frame_rate,
            interval: Self::interval_for(frame_rate),
            next_tick: None,
        }
    }

    /// Whole milliseconds per frame, never zero.
    pub fn interval_for(frame_rate: u32) -> Duration {
        assert!(frame_rate > 0, "frame rate must be positive");
        Duration::from_millis((1000 / frame_rate as u64).max(1))
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_active(&self) -> bool {
        self.next_tick.is_some()
    }

    pub fn start(&mut self, now: Instant) {
        self.next_tick = Some(now + self.interval);
    }

    pub fn stop(&mut self) {
        self.next_tick = None;
    }

    /// Takes effect right away: a running clock is rescheduled from `now`.
    pub fn set_frame_rate(&mut self, frame_rate: u32, now: Instant) {
        self.frame_rate = frame_rate;
        self.interval = Self::interval_for(frame_rate);
        if self.is_active() {
            self.start(now);
        }
    }

    /// Returns true once per elapsed interval. A clock that fell more than a
    /// full interval behind skips the missed ticks instead of bursting.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_tick {
            Some(due) if now >= due => {
                let next = due + self.interval;
                self.next_tick = Some(if next <= now { now + self.interval } else { next });
                true
            }
            _ => false,
        }
    }

    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.next_tick.map(|due| due.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_uses_whole_milliseconds() {
        assert_eq!(NotificationClock::interval_for(120), Duration::from_millis(8));
        assert_eq!(NotificationClock::interval_for(30), Duration::from_millis(33));
        assert_eq!(NotificationClock::interval_for(1), Duration::from_secs(1));
        assert_eq!(NotificationClock::interval_for(5000), Duration::from_millis(1));
    }

    #[test]
    fn ticks_once_per_interval() {
        let t0 = Instant::now();
        let mut clock = NotificationClock::new(100);
        assert!(!clock.poll(t0 + Duration::from_secs(1)));

        clock.start(t0);
        assert!(!clock.poll(t0 + Duration::from_millis(5)));
        assert!(clock.poll(t0 + Duration::from_millis(10)));
        assert!(!clock.poll(t0 + Duration::from_millis(15)));
        assert!(clock.poll(t0 + Duration::from_millis(21)));
        assert_eq!(
            clock.time_until_next(t0 + Duration::from_millis(25)),
            Some(Duration::from_millis(5))
        );
    }

    #[test]
    fn late_polls_do_not_burst() {
        let t0 = Instant::now();
        let mut clock = NotificationClock::new(100);
        clock.start(t0);

        let late = t0 + Duration::from_millis(95);
        assert!(clock.poll(late));
        assert!(!clock.poll(late));
        assert!(clock.poll(late + Duration::from_millis(10)));
    }

    #[test]
    fn frame_rate_change_reschedules() {
        let t0 = Instant::now();
        let mut clock = NotificationClock::new(10);
        clock.start(t0);

        let t1 = t0 + Duration::from_millis(20);
        clock.set_frame_rate(50, t1);
        assert_eq!(clock.interval(), Duration::from_millis(20));
        assert_eq!(clock.frame_rate(), 50);
        assert!(clock.poll(t1 + Duration::from_millis(20)));

        clock.stop();
        clock.set_frame_rate(25, t1);
        assert!(!clock.is_active());
        assert_eq!(clock.time_until_next(t1), None);
    }
}
