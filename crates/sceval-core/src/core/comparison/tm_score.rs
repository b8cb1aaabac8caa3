//! Template-modelling score.
//!
//! The score of a superposition over `N` aligned pairs, normalised by length `L`, is
//! `Σ 1 / (1 + (dᵢ/d₀)²) / L` with `d₀ = 1.24·∛(L − 15) − 1.8` (at least 0.5).
//! The superposition maximising the score is searched heuristically: seed fragments
//! of decreasing length are superposed, then the pair set is repeatedly narrowed to
//! the pairs lying within a search cutoff and re-superposed until it stops changing.
//!
//! Normalisation always uses the length of the *first* structure, so scoring a
//! design against its prediction reports coverage of the design.

use super::ComparisonError;
use super::alignment::{ResiduePairs, global_alignment, identity_pairs};
use super::superposition::{Superposition, first_non_finite, superpose};
use nalgebra::Point3;

const MIN_D0: f64 = 0.5;
const MIN_SEARCH_CUTOFF: f64 = 4.5;
const MAX_SEARCH_CUTOFF: f64 = 8.0;
const MIN_FRAGMENT: usize = 4;
const MAX_REFINEMENTS: usize = 20;

#[derive(Debug, Clone)]
pub struct TmAlignment {
    /// Residue index pairs `(index in A, index in B)` used for scoring.
    pub pairs: ResiduePairs,
    /// Best superposition found, mapping A onto B.
    pub superposition: Superposition,
    pub score: f64,
    pub normalized_length: usize,
}

/// Distance scale for a chain of `length` residues.
pub fn d0(length: usize) -> f64 {
    if length <= 21 {
        return MIN_D0;
    }
    (1.24 * ((length as f64) - 15.0).cbrt() - 1.8).max(MIN_D0)
}

/// Global fold similarity of structure A (representative atoms plus sequence)
/// to structure B.
///
/// Residues are paired one-to-one when the chains have equal length, otherwise
/// through a global sequence alignment.
pub fn similarity_score(
    coords_a: &[Point3<f64>],
    coords_b: &[Point3<f64>],
    seq_a: &str,
    seq_b: &str,
) -> Result<TmAlignment, ComparisonError> {
    for (seq, coords) in [(seq_a, coords_a), (seq_b, coords_b)] {
        let len = seq.chars().count();
        if len != coords.len() {
            return Err(ComparisonError::SequenceLength {
                sequence: len,
                coordinates: coords.len(),
            });
        }
    }
    if coords_a.is_empty() || coords_b.is_empty() {
        return Err(ComparisonError::Empty);
    }
    if let Some(index) = first_non_finite(coords_a).or_else(|| first_non_finite(coords_b)) {
        return Err(ComparisonError::NonFinite { index });
    }

    let pairs = if coords_a.len() == coords_b.len() {
        identity_pairs(coords_a.len())
    } else {
        global_alignment(seq_a, seq_b)
    };
    if pairs.is_empty() {
        return Err(ComparisonError::Empty);
    }

    let x: Vec<_> = pairs.iter().map(|&(i, _)| coords_a[i]).collect();
    let y: Vec<_> = pairs.iter().map(|&(_, j)| coords_b[j]).collect();
    let (score, superposition) = search(&x, &y, coords_a.len())?;

    Ok(TmAlignment {
        pairs,
        superposition,
        score,
        normalized_length: coords_a.len(),
    })
}

fn score_of(fit: &Superposition, x: &[Point3<f64>], y: &[Point3<f64>], d0: f64) -> (f64, Vec<f64>) {
    let distances: Vec<f64> = x
        .iter()
        .zip(y)
        .map(|(p, q)| (fit.apply(p) - q).norm())
        .collect();
    let sum = distances
        .iter()
        .map(|d| 1.0 / (1.0 + (d / d0).powi(2)))
        .sum();
    (sum, distances)
}

fn subset(points: &[Point3<f64>], indices: &[usize]) -> Vec<Point3<f64>> {
    indices.iter().map(|&i| points[i]).collect()
}

fn search(
    x: &[Point3<f64>],
    y: &[Point3<f64>],
    norm_length: usize,
) -> Result<(f64, Superposition), ComparisonError> {
    let n = x.len();
    let d0 = d0(norm_length);
    let cutoff = d0.clamp(MIN_SEARCH_CUTOFF, MAX_SEARCH_CUTOFF);

    let mut best_sum = f64::NEG_INFINITY;
    let mut best_fit = superpose(x, y)?;

    let mut fragment = n;
    loop {
        let step = (fragment / 2).max(1);
        let mut start = 0;
        while start + fragment <= n {
            let mut seed: Vec<usize> = (start..start + fragment).collect();
            for _ in 0..MAX_REFINEMENTS {
                let fit = superpose(&subset(x, &seed), &subset(y, &seed))?;
                let (sum, distances) = score_of(&fit, x, y, d0);
                if sum > best_sum {
                    best_sum = sum;
                    best_fit = fit;
                }

                let next = within_cutoff(&distances, cutoff);
                if next == seed {
                    break;
                }
                seed = next;
            }
            start += step;
        }

        if fragment <= MIN_FRAGMENT {
            break;
        }
        fragment = (fragment / 2).max(MIN_FRAGMENT);
    }

    Ok((best_sum / norm_length as f64, best_fit))
}

/// Pairs closer than `cutoff`; the cutoff is relaxed until at least three pairs
/// (or all of them) qualify. Once it passes the largest finite distance every
/// pair at a finite distance is returned.
fn within_cutoff(distances: &[f64], cutoff: f64) -> Vec<usize> {
    let needed = distances.len().min(3);
    let farthest = distances
        .iter()
        .copied()
        .filter(|d| d.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    let mut cutoff = cutoff;
    while cutoff <= farthest {
        let selected = below(distances, cutoff);
        if selected.len() >= needed {
            return selected;
        }
        cutoff += 0.5;
    }
    below(distances, f64::INFINITY)
}

fn below(distances: &[f64], cutoff: f64) -> Vec<usize> {
    distances
        .iter()
        .enumerate()
        .filter(|&(_, &d)| d < cutoff)
        .map(|(i, _)| i)
        .collect()
}
