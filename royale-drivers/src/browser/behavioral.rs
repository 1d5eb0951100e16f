use rand::rngs::OsRng;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone, Default)]
/// Produces human-like pauses between browser actions to reduce automation signals.
pub struct BehavioralEngine {}

impl BehavioralEngine {
    pub fn new() -> Self {
        Self {}
    }

    /// Pick a duration between `min` and `max` milliseconds (inclusive).
    pub fn jitter(&self, min: u64, max: u64) -> Duration {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        let mut rng = OsRng;
        Duration::from_millis(rng.gen_range(lo..=hi))
    }

    /// Sleep for a random duration between `min` and `max` milliseconds.
    pub async fn random_delay(&self, min: u64, max: u64) {
        sleep(self.jitter(min, max)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_in_range_even_when_swapped() {
        let engine = BehavioralEngine::new();
        for _ in 0..50 {
            let d = engine.jitter(300, 100).as_millis();
            assert!((100..=300).contains(&d));
        }
        assert_eq!(engine.jitter(5, 5), Duration::from_millis(5));
    }
}
