//! Global pairwise sequence alignment used to pair residues of chains with
//! different lengths before structural scoring.

const MATCH: i32 = 2;
const MISMATCH: i32 = -1;
const GAP: i32 = -2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Diagonal,
    Up,
    Left,
}

/// Aligned index pairs `(i, j)` between `seq_a[i]` and `seq_b[j]`, ascending.
pub type ResiduePairs = Vec<(usize, usize)>;

/// Pairs residues one-to-one; only valid for equal lengths.
pub fn identity_pairs(len: usize) -> ResiduePairs {
    (0..len).map(|i| (i, i)).collect()
}

/// Needleman-Wunsch alignment with linear gap penalties.
///
/// Returns the aligned (non-gap) index pairs. Ties prefer the diagonal so that
/// equal sequences always align to the identity.
pub fn global_alignment(seq_a: &str, seq_b: &str) -> ResiduePairs {
    let a: Vec<char> = seq_a.chars().collect();
    let b: Vec<char> = seq_b.chars().collect();
    let (n, m) = (a.len(), b.len());
    let width = m + 1;

    let mut score = vec![0i32; (n + 1) * width];
    let mut trace = vec![Step::Diagonal; (n + 1) * width];
    for i in 1..=n {
        score[i * width] = i as i32 * GAP;
        trace[i * width] = Step::Up;
    }
    for j in 1..=m {
        score[j] = j as i32 * GAP;
        trace[j] = Step::Left;
    }

    for i in 1..=n {
        for j in 1..=m {
            let substitution = if a[i - 1].eq_ignore_ascii_case(&b[j - 1]) {
                MATCH
            } else {
                MISMATCH
            };
            let diagonal = score[(i - 1) * width + j - 1] + substitution;
            let up = score[(i - 1) * width + j] + GAP;
            let left = score[i * width + j - 1] + GAP;

            let (best, step) = if diagonal >= up && diagonal >= left {
                (diagonal, Step::Diagonal)
            } else if up >= left {
                (up, Step::Up)
            } else {
                (left, Step::Left)
            };
            score[i * width + j] = best;
            trace[i * width + j] = step;
        }
    }

    let mut pairs = Vec::with_capacity(n.min(m));
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        match trace[i * width + j] {
            Step::Diagonal if i > 0 && j > 0 => {
                pairs.push((i - 1, j - 1));
                i -= 1;
                j -= 1;
            }
            Step::Up | Step::Diagonal if i > 0 => i -= 1,
            _ => j -= 1,
        }
    }
    pairs.reverse();
    pairs
}
