//! Seeded RNG
//!
//! xoshiro128** stream seeded through splitmix32, with labelled forks for
//! per-system streams. Two runs with equal seeds and equal fork labels in
//! equal orders produce identical streams; everything random in the
//! simulation flows through this type.

use rand::{RngCore, SeedableRng};
use std::f64::consts::TAU;

use crate::error::{CoreError, CoreResult};

#[inline]
fn rotl(x: u32, k: u32) -> u32 {
    x.rotate_left(k)
}

/// One step of splitmix32, used to spread a seed over the generator state.
fn splitmix32(state: &mut u32) -> u32 {
    *state = state.wrapping_add(0x9e37_79b9);
    let mut z = *state;
    z = (z ^ (z >> 16)).wrapping_mul(0x21f0_aaad);
    z = (z ^ (z >> 15)).wrapping_mul(0x735a_2d97);
    z ^ (z >> 15)
}

/// FNV-1a over a fork label, folded into the child seed.
fn hash32(label: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in label.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// Deterministic random number generator for the simulation.
#[derive(Debug, Clone)]
pub struct SeededRng {
    seed: u32,
    state: [u32; 4],
    gaussian_spare: Option<f64>,
}

impl SeededRng {
    /// Creates a generator from a 32-bit seed.
    pub fn new(seed: u32) -> Self {
        let mut sm = seed;
        let state = [
            splitmix32(&mut sm),
            splitmix32(&mut sm),
            splitmix32(&mut sm),
            splitmix32(&mut sm),
        ];
        Self {
            seed,
            state,
            gaussian_spare: None,
        }
    }

    /// The seed this generator was created from.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Derives an independent child stream from a label.
    ///
    /// Forking is a pure function of `(seed, label)`: it does not consume
    /// state from the parent, so fork order cannot perturb sibling streams.
    pub fn fork(&self, label: &str) -> SeededRng {
        SeededRng::new(self.seed ^ hash32(label))
    }

    /// Next raw 32-bit value (xoshiro128**).
    pub fn next_raw(&mut self) -> u32 {
        let s = &mut self.state;
        let result = rotl(s[1].wrapping_mul(5), 7).wrapping_mul(9);
        let t = s[1] << 9;
        s[2] ^= s[0];
        s[3] ^= s[1];
        s[1] ^= s[2];
        s[0] ^= s[3];
        s[2] ^= t;
        s[3] = rotl(s[3], 11);
        result
    }

    /// Uniform draw in `[0, 1)`.
    pub fn next(&mut self) -> f64 {
        self.next_raw() as f64 / (u32::MAX as f64 + 1.0)
    }

    /// Uniform integer in `[min, max]` (inclusive on both ends).
    pub fn next_int(&mut self, min: i64, max: i64) -> CoreResult<i64> {
        if min > max {
            return Err(CoreError::InvalidArgument(format!(
                "next_int range is inverted: {min} > {max}"
            )));
        }
        let span = (max - min) as u64 + 1;
        Ok(min + (self.next() * span as f64) as i64)
    }

    /// Uniform float in `[min, max)`.
    pub fn next_float(&mut self, min: f64, max: f64) -> f64 {
        min + self.next() * (max - min)
    }

    /// Picks one element uniformly.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> CoreResult<&'a T> {
        if items.is_empty() {
            return Err(CoreError::InvalidArgument("pick on empty slice".to_string()));
        }
        let index = (self.next() * items.len() as f64) as usize;
        Ok(&items[index.min(items.len() - 1)])
    }

    /// Picks one element with the given weights.
    ///
    /// Item and weight counts must match and the weights must sum to a
    /// positive value.
    pub fn weighted_pick<'a, T>(&mut self, items: &'a [T], weights: &[f64]) -> CoreResult<&'a T> {
        if items.is_empty() {
            return Err(CoreError::InvalidArgument(
                "weighted_pick on empty slice".to_string(),
            ));
        }
        if items.len() != weights.len() {
            return Err(CoreError::InvalidArgument(format!(
                "weighted_pick got {} items but {} weights",
                items.len(),
                weights.len()
            )));
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(CoreError::InvalidArgument(
                "weighted_pick weights sum to zero".to_string(),
            ));
        }
        let roll = self.next() * total;
        let mut cumulative = 0.0;
        for (item, &weight) in items.iter().zip(weights) {
            cumulative += weight;
            if roll < cumulative {
                return Ok(item);
            }
        }
        Ok(&items[items.len() - 1])
    }

    /// In-place Fisher-Yates shuffle.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = (self.next() * (i + 1) as f64) as usize;
            items.swap(j.min(i), i);
        }
    }

    /// Gaussian draw via Box-Muller, with the spare value cached.
    pub fn next_gaussian(&mut self, mean: f64, stddev: f64) -> f64 {
        if let Some(spare) = self.gaussian_spare.take() {
            return mean + stddev * spare;
        }
        let mut u1 = self.next();
        while u1 <= f64::MIN_POSITIVE {
            u1 = self.next();
        }
        let u2 = self.next();
        let radius = (-2.0 * u1.ln()).sqrt();
        let angle = TAU * u2;
        self.gaussian_spare = Some(radius * angle.sin());
        mean + stddev * radius * angle.cos()
    }
}

impl RngCore for SeededRng {
    fn next_u32(&mut self) -> u32 {
        self.next_raw()
    }

    fn next_u64(&mut self) -> u64 {
        let high = self.next_raw() as u64;
        let low = self.next_raw() as u64;
        (high << 32) | low
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_raw().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for SeededRng {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        SeededRng::new(u32::from_le_bytes(seed))
    }
}
