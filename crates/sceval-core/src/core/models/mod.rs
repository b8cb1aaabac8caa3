//! # Core Models Module
//!
//! Data structures for protein structures loaded from coordinate files.
//!
//! ## Key Components
//!
//! - [`atom`] - Individual atom with name, element and position
//! - [`residue`] - Residue with its atoms and one-letter code lookup
//! - [`chain`] - Ordered residues of one polymer chain
//! - [`structure`] - Complete structure with `(chain, residue number)` lookup
//! - [`builder`] - Incremental construction used by file readers
//! - [`ids`] - Stable keys for chains and residues
//!
//! ```ignore
//! use sceval::core::io::{pdb::PdbFile, traits::StructureFile};
//!
//! let (structure, _) = PdbFile::read_from_path("design.pdb")?;
//! let residue = structure.find_residue('A', 32).expect("residue A32");
//! println!("{} has {} atoms", residue.name, residue.atoms().len());
//! ```

pub mod atom;
pub mod builder;
pub mod chain;
pub mod ids;
pub mod residue;
pub mod structure;
