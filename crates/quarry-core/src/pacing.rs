//! Fixed pacing between articles.
//!
//! The pipeline sleeps once after every article, success or failure, for
//! `delay` plus a uniform random jitter in `[0, jitter)`. This is the only
//! backpressure Quarry applies; it does not adapt to failures or to how the
//! server responds.

use std::time::Duration;

/// Configuration for the inter-article pause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacingConfig {
    /// Minimum pause after each article.
    pub delay: Duration,

    /// Maximum random jitter added on top of `delay` (uniform [0, jitter)).
    ///
    /// Set to `Duration::ZERO` to disable.
    pub jitter: Duration,
}

impl PacingConfig {
    /// A fixed pause with no jitter.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            jitter: Duration::ZERO,
        }
    }

    /// No pause at all.
    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Draw the pause for one wait (delay + random jitter).
    pub fn effective_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.delay;
        }
        let jitter_ms = rand_jitter_ms(self.jitter.as_millis() as u64);
        self.delay + Duration::from_millis(jitter_ms)
    }
}

impl Default for PacingConfig {
    /// Two seconds plus up to one second of jitter.
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(2),
            jitter: Duration::from_secs(1),
        }
    }
}

// xorshift64 seeded from the clock; jitter only, not crypto.
fn rand_jitter_ms(max_ms: u64) -> u64 {
    if max_ms == 0 {
        return 0;
    }
    let mut x = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    // xorshift never leaves zero
    x |= 1;
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x % max_ms
}
