use std::time::{Duration, Instant};

/// Fixed-period timer that only re-arms when its work is done. Late ticks fire once
/// and the next one is measured from that moment; missed periods are not replayed.
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
    next_due: Option<Instant>,
}

impl Ticker {
    /// The first tick is due immediately.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_due: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_due.map_or(true, |due| now >= due)
    }

    pub fn rearm(&mut self, now: Instant) {
        self.next_due = Some(now + self.period);
    }

    /// Fires and re-arms in one step, for work that completes synchronously.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.rearm(now);
            true
        } else {
            false
        }
    }

    pub fn time_until_due(&self, now: Instant) -> Duration {
        self.next_due
            .map(|due| due.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_is_immediate() {
        let now = Instant::now();
        let mut ticker = Ticker::new(Duration::from_secs(1));
        assert!(ticker.poll(now));
        assert!(!ticker.poll(now));
        assert_eq!(ticker.time_until_due(now), Duration::from_secs(1));
    }

    #[test]
    fn slow_work_delays_instead_of_queueing() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_secs(1));
        assert!(ticker.poll(start));

        // Five periods pass with the UI stalled: exactly one tick fires.
        let late = start + Duration::from_secs(5);
        assert!(ticker.poll(late));
        assert!(!ticker.poll(late + Duration::from_millis(999)));
        assert!(ticker.poll(late + Duration::from_secs(1)));
    }

    #[test]
    fn deferred_rearm_holds_the_next_tick() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Duration::from_secs(1));
        assert!(ticker.is_due(start));

        // Work still in flight: is_due stays true but nothing re-arms until it returns.
        let finished = start + Duration::from_millis(2500);
        ticker.rearm(finished);
        assert!(!ticker.is_due(finished + Duration::from_millis(500)));
        assert!(ticker.is_due(finished + Duration::from_secs(1)));
    }
}
