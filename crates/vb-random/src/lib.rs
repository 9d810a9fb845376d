#![forbid(unsafe_code)]

use thiserror::Error;

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;
const MIX_CONST1: u64 = 0xBF58_476D_1CE4_E5B9;
const MIX_CONST2: u64 = 0x94D0_49BB_1331_11EB;
pub const DEFAULT_RNG_SEED: u64 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RandomError {
    #[error("upper_bound must be > 0")]
    InvalidUpperBound,
    #[error("uniform range requires low < high and both finite")]
    InvalidRange,
}

impl RandomError {
    #[must_use]
    pub const fn reason_code(self) -> &'static str {
        match self {
            Self::InvalidUpperBound => "random_upper_bound_rejected",
            Self::InvalidRange => "random_float_range_rejected",
        }
    }
}

/// Counter-based splitmix64 stream. Two generators built from the same seed
/// always yield the same sequence, which keeps idiom inputs reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeterministicRng {
    stream_seed: u64,
    counter: u64,
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(DEFAULT_RNG_SEED)
    }
}

impl DeterministicRng {
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            stream_seed: seed,
            counter: 0,
        }
    }

    #[must_use]
    pub fn next_u64(&mut self) -> u64 {
        self.counter = self.counter.wrapping_add(1);
        splitmix64(
            self.stream_seed
                .wrapping_add(self.counter.wrapping_mul(GOLDEN_GAMMA)),
        )
    }

    #[must_use]
    pub fn next_f64(&mut self) -> f64 {
        // Sample the high 53 bits for IEEE754 mantissa precision in [0, 1).
        let sample = self.next_u64() >> 11;
        sample as f64 / (1u64 << 53) as f64
    }

    pub fn bounded_u64(&mut self, upper_bound: u64) -> Result<u64, RandomError> {
        if upper_bound == 0 {
            return Err(RandomError::InvalidUpperBound);
        }

        let threshold = u64::MAX - u64::MAX % upper_bound;

        loop {
            let candidate = self.next_u64();
            if candidate < threshold {
                return Ok(candidate % upper_bound);
            }
        }
    }

    pub fn uniform(&mut self, low: f64, high: f64) -> Result<f64, RandomError> {
        if !(low.is_finite() && high.is_finite() && low < high) {
            return Err(RandomError::InvalidRange);
        }
        Ok(low + (high - low) * self.next_f64())
    }

    /// `len` samples from `[0, 1)`.
    #[must_use]
    pub fn fill_f64(&mut self, len: usize) -> Vec<f64> {
        (0..len).map(|_| self.next_f64()).collect()
    }

    pub fn fill_uniform(
        &mut self,
        len: usize,
        low: f64,
        high: f64,
    ) -> Result<Vec<f64>, RandomError> {
        (0..len).map(|_| self.uniform(low, high)).collect()
    }
}

fn splitmix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(MIX_CONST1);
    x ^= x >> 27;
    x = x.wrapping_mul(MIX_CONST2);
    x ^ (x >> 31)
}
