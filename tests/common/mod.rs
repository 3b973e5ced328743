//! Shared synthetic series generators for integration tests.

#![allow(dead_code)]

use levy_sections::ReturnSeries;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// I.i.d. Gaussian returns with standard deviation `sigma`.
pub fn gaussian_returns(n: usize, sigma: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, sigma).unwrap();
    (0..n).map(|_| normal.sample(&mut rng)).collect()
}

/// Gaussian returns whose variance is multiplied by `variance_factor` from
/// index `break_at` on.
pub fn variance_step(
    n: usize,
    sigma: f64,
    break_at: usize,
    variance_factor: f64,
    seed: u64,
) -> Vec<f64> {
    let scale = variance_factor.sqrt();
    gaussian_returns(n, sigma, seed)
        .into_iter()
        .enumerate()
        .map(|(i, r)| if i >= break_at { r * scale } else { r })
        .collect()
}

/// Deterministic +/- `amplitude` series.
pub fn alternating(n: usize, amplitude: f64) -> Vec<f64> {
    (0..n)
        .map(|i| if i % 2 == 0 { amplitude } else { -amplitude })
        .collect()
}

/// Mixed batch: stable series, broken series, and one too short to use.
pub fn mixed_batch(count: usize, seed: u64) -> Vec<(ReturnSeries, Option<bool>)> {
    let mut items: Vec<(ReturnSeries, Option<bool>)> = (0..count)
        .map(|i| {
            let seed = seed + i as u64;
            if i % 2 == 0 {
                let values = gaussian_returns(1000, 0.01, seed);
                (ReturnSeries::new(format!("stable_{i}"), values), Some(false))
            } else {
                let values = variance_step(1000, 0.01, 500, 5.0, seed);
                (ReturnSeries::new(format!("break_{i}"), values), Some(true))
            }
        })
        .collect();
    items.push((ReturnSeries::new("short", vec![0.01; 5]), None));
    items
}
