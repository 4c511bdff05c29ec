//! Retry delay policies for the fetcher

use std::time::Duration;

/// Delay policy applied between failed fetch attempts.
///
/// The original collectors all slept a flat few seconds between
/// retries; `Exponential` doubles the base per attempt for sources
/// that rate-limit aggressively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    Exponential { base: Duration },
}

impl Backoff {
    /// Delay to sleep after the given failed attempt (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(d) => *d,
            Self::Exponential { base } => {
                // cap the shift so a misconfigured attempt count can't overflow
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1).min(16));
                base.saturating_mul(factor)
            }
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Fixed(Duration::from_secs(5))
    }
}
