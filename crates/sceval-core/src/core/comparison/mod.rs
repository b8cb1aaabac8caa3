//! Structural comparison between coordinate frames.
//!
//! - [`superposition`] finds the optimal rigid-body fit (Kabsch) and the RMSD after it.
//! - [`alignment`] pairs residues of two chains by sequence when their lengths differ.
//! - [`tm_score`] scores global fold similarity on a 0-1 scale.

pub mod alignment;
pub mod superposition;
pub mod tm_score;

pub use superposition::{Superposition, rmsd, superpose};
pub use tm_score::{TmAlignment, similarity_score};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ComparisonError {
    #[error("Cannot compare frames of different sizes ({left} vs {right} atoms)")]
    LengthMismatch { left: usize, right: usize },

    #[error("Cannot compare empty coordinate sets")]
    Empty,

    #[error("Frames '{left}' and '{right}' hold different atom parts")]
    AtomPartMismatch { left: String, right: String },

    #[error("Sequence of length {sequence} does not match {coordinates} coordinates")]
    SequenceLength { sequence: usize, coordinates: usize },

    #[error("Coordinate {index} is not finite")]
    NonFinite { index: usize },

    #[error("Singular value decomposition did not converge")]
    Decomposition,
}
