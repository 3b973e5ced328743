//! Section Builder Property Tests
//!
//! Layout and determinism properties of the volatility clock:
//!
//! 1. **Contiguity**: sections tile the window-trimmed range without gaps
//! 2. **Idempotence**: identical input, identical sections
//! 3. **Monotonicity**: larger budgets never produce more sections, and
//!    mean durations grow with the budget across many series
//! 4. **Prefix-sum search**: agrees with the greedy scan on exact arithmetic
//! 5. **Threshold rules**: inclusive vs strict, discard vs retain

mod common;

use common::gaussian_returns;
use levy_sections::preprocessing::{local_variance, VarianceConvention};
use levy_sections::sections::{
    covered_length, SectionBuilder, SectionPolicy, ThresholdRule, TrailingPolicy,
};
use levy_sections::validation::validate_sections;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const Q: usize = 10;

fn builder(tau: f64) -> SectionBuilder {
    SectionBuilder::new(tau).unwrap()
}

// ============================================================================
// 1. Contiguity and coverage
// ============================================================================

#[test]
fn test_sections_are_contiguous_and_in_range() {
    for seed in 0..5 {
        let returns = gaussian_returns(2000, 0.01, seed);
        for tau in [1e-4, 1e-3, 1e-2] {
            let sections = builder(tau)
                .build_from_returns(&returns, Q, VarianceConvention::Sample)
                .unwrap();

            let result = validate_sections(&sections, Q, returns.len() - 2 * Q);
            assert!(result.is_valid(), "seed {seed} tau {tau}: {result}");
            assert!(sections.iter().all(|s| s.duration >= 1));
            assert!(sections.last().unwrap().end() <= returns.len() - Q);
        }
    }
}

#[test]
fn test_retained_trailing_section_covers_everything() {
    let returns = gaussian_returns(1500, 0.01, 7);
    let variance = local_variance(&returns, Q, VarianceConvention::Sample).unwrap();
    let aligned = &returns[Q..returns.len() - Q];

    let policy = SectionPolicy {
        trailing: TrailingPolicy::Retain,
        ..Default::default()
    };
    let sections = builder(5e-3).with_policy(policy).build(aligned, &variance, Q);

    assert_eq!(covered_length(&sections), aligned.len());
    assert!(validate_sections(&sections, Q, aligned.len()).is_valid());
}

#[test]
fn test_return_sums_match_covered_returns() {
    let returns = gaussian_returns(800, 0.02, 3);
    let sections = builder(4e-3)
        .build_from_returns(&returns, Q, VarianceConvention::Sample)
        .unwrap();

    for section in &sections {
        let expected: f64 = returns[section.start..section.end()].iter().sum();
        assert!((section.return_sum - expected).abs() < 1e-12);
        assert!(section.variance_sum >= section.tau);
    }
}

// ============================================================================
// 2. Idempotence
// ============================================================================

#[test]
fn test_build_is_idempotent() {
    let returns = gaussian_returns(3000, 0.01, 11);
    let b = builder(2e-3);

    let first = b.build_from_returns(&returns, Q, VarianceConvention::Sample).unwrap();
    let second = b.build_from_returns(&returns, Q, VarianceConvention::Sample).unwrap();
    assert_eq!(first, second);
}

// ============================================================================
// 3. Monotonicity in tau
// ============================================================================

#[test]
fn test_section_count_non_increasing_in_tau() {
    let returns = gaussian_returns(4000, 0.01, 5);
    let variance = local_variance(&returns, Q, VarianceConvention::Sample).unwrap();
    let aligned = &returns[Q..returns.len() - Q];

    let taus = [2e-4, 5e-4, 1e-3, 2e-3, 5e-3, 1e-2, 2e-2];
    let counts: Vec<usize> = taus
        .iter()
        .map(|&tau| builder(tau).build(aligned, &variance, Q).len())
        .collect();

    for pair in counts.windows(2) {
        assert!(pair[0] >= pair[1], "counts not monotone: {counts:?}");
    }
    assert!(counts[0] > counts[counts.len() - 1]);
}

#[test]
fn test_mean_duration_grows_with_tau() {
    const SERIES: u64 = 30;
    let taus = [5e-4, 5e-3, 5e-2];

    let per_series: Vec<Vec<f64>> = (0..SERIES)
        .map(|seed| {
            let returns = gaussian_returns(5000, 0.01, 1000 + seed);
            let variance = local_variance(&returns, Q, VarianceConvention::Sample).unwrap();
            let aligned = &returns[Q..returns.len() - Q];
            taus.iter()
                .map(|&tau| {
                    let sections = builder(tau).build(aligned, &variance, Q);
                    if sections.is_empty() {
                        return f64::NAN;
                    }
                    covered_length(&sections) as f64 / sections.len() as f64
                })
                .collect()
        })
        .collect();

    let increasing = per_series
        .iter()
        .filter(|means| means[0] < means[1] && means[1] < means[2])
        .count();
    let fraction = increasing as f64 / SERIES as f64;

    let averages: Vec<f64> = (0..taus.len())
        .map(|i| per_series.iter().map(|means| means[i]).sum::<f64>() / SERIES as f64)
        .collect();

    // Budgets a decade apart at variance 1e-4: about 5, 50 and 500 steps.
    println!("mean duration by tau {averages:?}, increasing in {increasing}/{SERIES} series");
    assert!(averages[0] < averages[1] && averages[1] < averages[2], "{averages:?}");
    assert!(averages[1] > 5.0 * averages[0] && averages[2] > 5.0 * averages[1], "{averages:?}");
    assert!(fraction >= 0.9, "increasing in only {increasing}/{SERIES} series");
}

// ============================================================================
// 4. Prefix-sum search
// ============================================================================

#[test]
fn test_bisect_matches_greedy_on_exact_values() {
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..20 {
        let n = rng.gen_range(10..300);
        // Quarter-integers keep every partial sum exact.
        let variance: Vec<f64> = (0..n).map(|_| rng.gen_range(0..8) as f64 * 0.25).collect();
        let returns: Vec<f64> = (0..n).map(|_| rng.gen_range(-4..4) as f64 * 0.5).collect();
        let tau = rng.gen_range(1..12) as f64 * 0.25;

        for threshold in [ThresholdRule::Inclusive, ThresholdRule::Strict] {
            for trailing in [TrailingPolicy::Discard, TrailingPolicy::Retain] {
                let policy = SectionPolicy {
                    threshold,
                    trailing,
                    min_sections: 1,
                };
                let b = builder(tau).with_policy(policy);
                assert_eq!(
                    b.build(&returns, &variance, 3),
                    b.build_bisect(&returns, &variance, 3),
                    "tau {tau} {threshold:?} {trailing:?}"
                );
            }
        }
    }
}

// ============================================================================
// 5. Threshold rules
// ============================================================================

#[test]
fn test_inclusive_vs_strict_at_exact_budget() {
    let variance = [0.5, 0.5, 0.5, 0.5, 0.5, 0.5];
    let returns = [1.0; 6];

    let inclusive = builder(1.0).build(&returns, &variance, 0);
    let durations: Vec<usize> = inclusive.iter().map(|s| s.duration).collect();
    assert_eq!(durations, vec![2, 2, 2]);

    let strict_policy = SectionPolicy {
        threshold: ThresholdRule::Strict,
        ..Default::default()
    };
    let strict = builder(1.0).with_policy(strict_policy).build(&returns, &variance, 0);
    let durations: Vec<usize> = strict.iter().map(|s| s.duration).collect();
    assert_eq!(durations, vec![3, 3]);
}

#[test]
fn test_too_few_sections_is_degenerate() {
    let returns = gaussian_returns(200, 0.01, 1);
    let err = builder(1.0)
        .build_from_returns(&returns, Q, VarianceConvention::Sample)
        .unwrap_err();
    assert!(err.is_scale_local());
}
