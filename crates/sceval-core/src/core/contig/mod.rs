//! # Contig Language
//!
//! Parsing, serialization and index translation for the compact contig grammar
//! used to describe motif-scaffolding problems.
//!
//! ## Grammar
//!
//! A contig is a `/`-separated list of tokens. A token whose first character is
//! a digit is a *scaffold gap* (`31` or `31-40`, a length range with no residue
//! identity). Any other token is a *motif block*: a chain letter followed by a
//! single residue number (`A32`) or an inclusive range (`B25-46`).
//!
//! ```ignore
//! use sceval::core::contig::Contig;
//!
//! let contig: Contig = "31-31/B25-46/32-32/A32/A4/A5".parse()?;
//! assert_eq!(contig.motif_length(), 25);
//! ```
//!
//! ## Coordinate frames
//!
//! The same motif lives in two numbering schemes: the *reference* structure the
//! motif was cut from, and the *design* structure the generator produced. The
//! order of motif blocks in a contig fixes the position-for-position
//! correspondence between the two, so every operation here preserves order.

mod indices;
mod parser;
mod redesign;

pub use indices::{DesignLayout, MotifIndexSet, correspondence};
pub use parser::{Contig, MotifBlock, Segment};
pub use redesign::{RedesignSet, apply_redesign};

use std::fmt;
use thiserror::Error;

/// A single residue addressed by chain identifier and residue number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResidueRef {
    /// Single-character chain identifier (e.g., 'A').
    pub chain: char,
    /// Residue sequence number as written in the structure file.
    pub number: isize,
}

impl ResidueRef {
    pub fn new(chain: char, number: isize) -> Self {
        Self { chain, number }
    }
}

impl fmt::Display for ResidueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.chain, self.number)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContigError {
    #[error("Motif block '{0}' does not start with a chain identifier")]
    MissingChain(String),

    #[error("Invalid residue number in token '{token}': '{value}'")]
    InvalidNumber { token: String, value: String },

    #[error("Range in token '{token}' has start {start} greater than end {end}")]
    InvalidRange {
        token: String,
        start: isize,
        end: isize,
    },

    #[error("Redesign position {0} is not part of the motif")]
    RedesignOutsideMotif(ResidueRef),

    #[error("Motif correspondence mismatch: reference has {reference} residues, design has {design}")]
    CorrespondenceMismatch { reference: usize, design: usize },
}
