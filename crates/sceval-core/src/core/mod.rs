//! # Core Module
//!
//! Stateless building blocks shared by the engine and the workflows.
//!
//! - **Motif Specification** ([`contig`]) - Parsing contigs and mapping motif residues
//!   between the reference and design coordinate frames
//! - **Molecular Representation** ([`models`]) - Chains, residues and atoms
//! - **File I/O** ([`io`]) - PDB and FASTA readers and writers
//! - **Coordinate Selection** ([`selection`]) - Ordered coordinate frames extracted by contig
//! - **Structural Comparison** ([`comparison`]) - Superposition RMSD and TM-score
//!
//! Nothing in this layer spawns processes or writes outside the paths it is given.

pub mod comparison;
pub mod contig;
pub mod io;
pub mod models;
pub mod selection;
