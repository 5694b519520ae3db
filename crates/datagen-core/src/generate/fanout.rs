//! # Fanout Sampling
//!
//! Samples how many child rows a single parent row produces in a `fact`
//! node, before any table-level `effect` modifier scales the count.

use rand::Rng;
use rand_distr::{Distribution, Poisson};

use crate::schema::types::FanoutSpec;

/// Sample a raw fanout count, already clamped to `[min, max]`.
pub fn sample(spec: &FanoutSpec, rng: &mut impl Rng) -> u64 {
    match spec {
        FanoutSpec::Poisson { lambda, min, max } => {
            let dist = Poisson::new(*lambda).unwrap_or_else(|_| Poisson::new(1.0).unwrap());
            let raw: f64 = dist.sample(rng);
            (raw.round() as i64).clamp(*min as i64, *max as i64) as u64
        }
        FanoutSpec::Uniform { min, max } => {
            if min >= max {
                *min
            } else {
                rng.random_range(*min..=*max)
            }
        }
    }
}

/// Apply a table-level effect multiplier to a sampled fanout count, then
/// re-clamp to `[min, max]` and round half-to-even (banker's rounding,
/// matching how the value modifier pipeline rounds scaled counts).
pub fn scale_and_reclamp(raw: u64, multiplier: f64, min: u64, max: u64) -> u64 {
    let scaled = raw as f64 * multiplier;
    let rounded = round_half_to_even(scaled);
    rounded.clamp(min as i64, max as i64) as u64
}

fn round_half_to_even(x: f64) -> i64 {
    let floor = x.floor();
    let diff = x - floor;
    let floor_i = floor as i64;
    if diff < 0.5 {
        floor_i
    } else if diff > 0.5 {
        floor_i + 1
    } else if floor_i % 2 == 0 {
        floor_i
    } else {
        floor_i + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn uniform_fanout_respects_bounds() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let spec = FanoutSpec::Uniform { min: 2, max: 5 };
        for _ in 0..100 {
            let n = sample(&spec, &mut rng);
            assert!((2..=5).contains(&n));
        }
    }

    #[test]
    fn poisson_fanout_is_clamped() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let spec = FanoutSpec::Poisson {
            lambda: 50.0,
            min: 0,
            max: 10,
        };
        for _ in 0..100 {
            let n = sample(&spec, &mut rng);
            assert!(n <= 10);
        }
    }

    #[test]
    fn half_to_even_rounds_ties_to_even() {
        assert_eq!(round_half_to_even(2.5), 2);
        assert_eq!(round_half_to_even(3.5), 4);
        assert_eq!(round_half_to_even(2.4), 2);
        assert_eq!(round_half_to_even(2.6), 3);
    }

    #[test]
    fn scale_and_reclamp_respects_final_bounds() {
        let scaled = scale_and_reclamp(4, 10.0, 0, 5);
        assert_eq!(scaled, 5);
    }
}
