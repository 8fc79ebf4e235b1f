//! Weighted sampling primitives. Every function takes its random source as a
//! parameter so runs can be reproduced from a seed.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeMap;

pub type Weights = BTreeMap<String, f64>;

fn weight_of(weights: &Weights, option: &str) -> f64 {
    match weights.get(option) {
        Some(w) if w.is_finite() && *w > 0.0 => *w,
        _ => 0.0,
    }
}

/// Draws one option with probability proportional to its weight.
///
/// Only the weights of `options` take part in the normalisation; entries of
/// `weights` for other labels are ignored. When every candidate has weight 0
/// the draw is uniform. Returns `None` only for an empty candidate set.
pub fn weighted_choice<'a, R: Rng + ?Sized>(
    options: &[&'a str],
    weights: &Weights,
    rng: &mut R,
) -> Option<&'a str> {
    if options.is_empty() {
        return None;
    }

    let total: f64 = options.iter().map(|o| weight_of(weights, o)).sum();
    if total <= 0.0 {
        return options.get(rng.gen_range(0..options.len())).copied();
    }

    let draw: f64 = rng.gen();
    let mut cumulative = 0.0;
    let mut last_positive = None;
    for option in options {
        let w = weight_of(weights, option);
        if w == 0.0 {
            continue;
        }
        cumulative += w / total;
        last_positive = Some(*option);
        if draw < cumulative {
            return Some(*option);
        }
    }
    // Rounding can leave the final cumulative value a hair under 1.0.
    last_positive
}

/// Draws `k` distinct options without replacement, `k` clamped to the pool size.
pub fn weighted_sample_unique<'a, R: Rng + ?Sized>(
    options: &[&'a str],
    weights: &Weights,
    k: usize,
    rng: &mut R,
) -> Vec<&'a str> {
    let k = k.min(options.len());
    let mut pool: Vec<&'a str> = options.to_vec();
    let mut picked = Vec::with_capacity(k);

    while picked.len() < k {
        let Some(choice) = weighted_choice(&pool, weights, rng) else {
            break;
        };
        if let Some(pos) = pool.iter().position(|o| *o == choice) {
            pool.remove(pos);
        }
        picked.push(choice);
    }
    picked
}

/// Picks a count in `[min, max]` from a triangular distribution whose mode is
/// `min`: respondents tick few boxes more often than many.
pub fn random_k<R: Rng + ?Sized>(min: usize, max: usize, rng: &mut R) -> usize {
    if max <= min {
        return min;
    }
    // Continuous triangle on [min, max + 1) with its peak at min, then floored.
    let low = min as f64;
    let high = (max + 1) as f64;
    let u: f64 = rng.gen();
    let x = high - (high - low) * (1.0 - u).sqrt();
    (x.floor() as usize).clamp(min, max)
}

/// Uniform count in `[min, max]`, used by the unweighted strategy.
pub fn uniform_k<R: Rng + ?Sized>(min: usize, max: usize, rng: &mut R) -> usize {
    if max <= min {
        return min;
    }
    rng.gen_range(min..=max)
}

/// Column index to click for each matrix row.
///
/// The columns are shuffled once and rows cycle through that order, so every
/// complete run of `cols` rows uses each column exactly once.
pub fn column_plan<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Vec<usize> {
    if cols == 0 {
        return Vec::new();
    }
    let mut permutation: Vec<usize> = (0..cols).collect();
    permutation.shuffle(rng);
    (0..rows).map(|i| permutation[i % cols]).collect()
}
