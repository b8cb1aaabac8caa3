//! Provides input/output functionality for structure and sequence files.
//!
//! Structure formats implement the [`traits::StructureFile`] interface; FASTA
//! handling lives in [`fasta`] since sequences carry no structure.

pub mod fasta;
pub mod pdb;
pub mod traits;
