use rand::Rng;
use std::time::Duration;

/// Exponential reconnect delay with additive jitter.
///
/// Delays double from `initial` up to `max`; each returned delay adds a
/// uniform jitter in `[0, jitter]`. `reset` is called once a connection opens.
#[derive(Clone, Debug)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    jitter: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration, jitter: Duration) -> Self {
        let max = max.max(initial);
        Self {
            initial,
            max,
            jitter,
            current: initial,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let base = self.current;
        self.current = (self.current * 2).min(self.max);
        base + self.sample_jitter()
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }

    fn sample_jitter(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_up_to_cap() {
        let mut backoff = Backoff::new(Duration::from_millis(200), Duration::from_secs(2), Duration::ZERO);
        let delays: Vec<u128> = (0..7).map(|_| backoff.next_delay().as_millis()).collect();
        assert_eq!(delays, vec![200, 400, 800, 1600, 2000, 2000, 2000]);

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
    }

    #[test]
    fn jitter_stays_in_range() {
        let mut backoff = Backoff::new(Duration::from_millis(200), Duration::from_secs(2), Duration::from_millis(200));
        for _ in 0..50 {
            let delay = backoff.next_delay();
            assert!(delay >= Duration::from_millis(200));
            assert!(delay <= Duration::from_millis(2200));
        }
    }
}
