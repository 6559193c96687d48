//! Randomized delay before finishing completion writes.
//!
//! Many agents decide at the same instant; without desynchronization
//! their completion writes line up and collide at the sink's optimistic
//! concurrency layer, producing heavy-tailed retry costs. Sleeping a
//! uniform random interval before each finishing write spreads the
//! writes out. The jitter is not correctness-critical, which is why the
//! bound is an explicit configuration parameter -- tests set it to zero
//! for determinism.

use std::time::Duration;

use rand::Rng;

/// Uniform completion jitter with a configurable upper bound.
#[derive(Debug, Clone, Copy)]
pub struct CompletionJitter {
    bound_ms: u64,
}

impl CompletionJitter {
    /// Build a jitter with the given upper bound.
    pub const fn new(bound: Duration) -> Self {
        // Jitter bounds are operator-supplied milliseconds, far below u64::MAX.
        #[allow(clippy::cast_possible_truncation)]
        let bound_ms = bound.as_millis() as u64;
        Self { bound_ms }
    }

    /// A disabled jitter that never sleeps. Used in tests.
    pub const fn zero() -> Self {
        Self { bound_ms: 0 }
    }

    /// Draw one delay from `[0, bound)`.
    pub fn sample(&self, rng: &mut impl Rng) -> Duration {
        if self.bound_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rng.random_range(0..self.bound_ms))
    }

    /// Sleep for one sampled delay.
    pub async fn sleep(&self) {
        let delay = {
            let mut rng = rand::rng();
            self.sample(&mut rng)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
