//! Seedable Xorshift64 generator with per-seed stream derivation.
//!
//! Tracking never touches a global generator. Every seed gets its own
//! stream via [`Xorshift64::for_stream`], so a run is reproducible from a
//! single `u64` and its output does not depend on how seeds were split
//! across worker threads.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Xorshift64 PRNG (shifts 13, 7, 17). Same seed, same sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Xorshift64 {
    state: u64,
}

/// SplitMix64 finalizer, used to decorrelate derived stream seeds.
fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

impl Xorshift64 {
    /// Zero is a fixed point of xorshift and is replaced by this value.
    const FALLBACK_SEED: u64 = 0x5EED_DEAD_BEEF_CAFE;

    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { Self::FALLBACK_SEED } else { seed },
        }
    }

    /// Derives an independent generator for stream `stream` of a run seeded with `seed`.
    ///
    /// The tracker uses the global seed index as the stream id.
    pub fn for_stream(seed: u64, stream: u64) -> Self {
        Self::new(splitmix64(seed ^ splitmix64(stream)))
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    /// Uniform f64 in [0, 1) from the upper 53 bits.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform f64 in [min, max).
    pub fn next_range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }

    /// Uniform usize in [0, max).
    ///
    /// # Panics
    ///
    /// Panics if `max` is 0.
    pub fn next_usize(&mut self, max: usize) -> usize {
        (self.next_u64() as usize) % max
    }

    /// Fair coin flip.
    pub fn next_bool(&mut self) -> bool {
        self.next_u64() >> 63 == 1
    }

    /// Standard normal draw (Box-Muller, one value per call).
    pub fn next_gaussian(&mut self) -> f64 {
        // 1 - u keeps the log argument in (0, 1].
        let u1 = 1.0 - self.next_f64();
        let u2 = self.next_f64();
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }

    /// Isotropic 3D Gaussian vector with unit variance per axis.
    pub fn next_gaussian_vec3(&mut self) -> DVec3 {
        let x = self.next_gaussian();
        let y = self.next_gaussian();
        let z = self.next_gaussian();
        DVec3::new(x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_u64_produces_known_golden_value_for_seed_42() {
        // Changing this breaks reproducibility of every stored run.
        let mut rng = Xorshift64::new(42);
        assert_eq!(rng.next_u64(), 45_454_805_674);
    }

    #[test]
    fn seed_zero_does_not_stall() {
        let mut rng = Xorshift64::new(0);
        assert_ne!(rng.next_u64(), 0);
        assert_ne!(rng.next_u64(), 0);
    }

    #[test]
    fn same_stream_same_sequence() {
        let mut a = Xorshift64::for_stream(7, 19);
        let mut b = Xorshift64::for_stream(7, 19);
        for i in 0..500 {
            assert_eq!(a.next_u64(), b.next_u64(), "diverged at {i}");
        }
    }

    #[test]
    fn neighbouring_streams_differ() {
        let mut a = Xorshift64::for_stream(7, 0);
        let mut b = Xorshift64::for_stream(7, 1);
        let same = (0..100).filter(|_| a.next_u64() == b.next_u64()).count();
        assert_eq!(same, 0);
    }

    #[test]
    fn next_bool_is_roughly_fair() {
        let mut rng = Xorshift64::new(2024);
        let heads = (0..10_000).filter(|_| rng.next_bool()).count();
        assert!((4_500..5_500).contains(&heads), "heads = {heads}");
    }

    #[test]
    fn gaussian_moments_are_standard() {
        let mut rng = Xorshift64::new(31337);
        let n = 20_000;
        let draws: Vec<f64> = (0..n).map(|_| rng.next_gaussian()).collect();
        let mean = draws.iter().sum::<f64>() / n as f64;
        let var = draws.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean = {mean}");
        assert!((var - 1.0).abs() < 0.05, "variance = {var}");
    }

    #[test]
    fn gaussian_vec3_is_finite() {
        let mut rng = Xorshift64::new(5);
        for _ in 0..1_000 {
            assert!(rng.next_gaussian_vec3().is_finite());
        }
    }

    #[test]
    fn serialization_roundtrip_preserves_state() {
        let mut rng = Xorshift64::new(42);
        for _ in 0..50 {
            rng.next_u64();
        }
        let json = serde_json::to_string(&rng).unwrap();
        let mut restored: Xorshift64 = serde_json::from_str(&json).unwrap();
        for _ in 0..100 {
            assert_eq!(rng.next_u64(), restored.next_u64());
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn next_f64_in_unit_interval(seed: u64, stream: u64) {
                let mut rng = Xorshift64::for_stream(seed, stream);
                for _ in 0..100 {
                    let v = rng.next_f64();
                    prop_assert!((0.0..1.0).contains(&v), "next_f64() = {v}");
                }
            }

            #[test]
            fn next_usize_below_max(seed: u64, max in 1_usize..10_000) {
                let mut rng = Xorshift64::new(seed);
                for _ in 0..100 {
                    prop_assert!(rng.next_usize(max) < max);
                }
            }

            #[test]
            fn gaussian_never_nan(seed: u64) {
                let mut rng = Xorshift64::new(seed);
                for _ in 0..100 {
                    prop_assert!(rng.next_gaussian().is_finite());
                }
            }
        }
    }
}
