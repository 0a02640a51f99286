//! Suspension and delay selection for the dispatch loops.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::model::Pacing;

/// Suspends the calling task. Injected so tests can run ticks without
/// real delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real suspension on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Draw a delay uniformly from `[min, max]`. Inverted bounds collapse to `min`.
pub fn pick_delay<R: Rng + ?Sized>(rng: &mut R, pacing: Pacing) -> Duration {
    let Pacing {
        min_delay_ms: min,
        max_delay_ms: max,
    } = pacing;
    let ms = if max <= min { min } else { rng.gen_range(min..=max) };
    Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_pick_delay_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let pacing = Pacing {
            min_delay_ms: 2000,
            max_delay_ms: 4000,
        };
        for _ in 0..200 {
            let d = pick_delay(&mut rng, pacing).as_millis();
            assert!((2000..=4000).contains(&d), "delay {} out of range", d);
        }
    }

    #[test]
    fn test_pick_delay_fixed_and_inverted() {
        let mut rng = StdRng::seed_from_u64(1);
        let zero = Pacing { min_delay_ms: 0, max_delay_ms: 0 };
        assert_eq!(pick_delay(&mut rng, zero), Duration::ZERO);

        let inverted = Pacing { min_delay_ms: 500, max_delay_ms: 100 };
        assert_eq!(pick_delay(&mut rng, inverted), Duration::from_millis(500));
    }

    #[test]
    fn test_pick_delay_is_seed_deterministic() {
        let pacing = Pacing::default();
        let a: Vec<_> = {
            let mut rng = StdRng::seed_from_u64(42);
            (0..10).map(|_| pick_delay(&mut rng, pacing)).collect()
        };
        let b: Vec<_> = {
            let mut rng = StdRng::seed_from_u64(42);
            (0..10).map(|_| pick_delay(&mut rng, pacing)).collect()
        };
        assert_eq!(a, b);
    }
}
