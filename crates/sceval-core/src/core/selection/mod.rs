//! Coordinate extraction from loaded structures.
//!
//! A [`CoordinateFrame`] is an ordered list of atom positions plus the identity
//! of each atom. Frames are built in *selector order*, never file order, because
//! structural comparison pairs atoms by position.

mod frame;

pub use frame::{AtomPart, CoordinateFrame, FrameAtom};

use crate::core::contig::{Contig, MotifIndexSet, ResidueRef};
use crate::core::io::pdb::{PdbError, PdbFile};
use crate::core::io::traits::StructureFile;
use crate::core::models::structure::Structure;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("Residue {chain}{number} not found in {source_name}")]
    ResidueNotFound {
        chain: char,
        number: isize,
        source_name: String,
    },

    #[error("Atom '{atom}' missing from residue {residue} in {source_name}")]
    AtomNotFound {
        residue: ResidueRef,
        atom: String,
        source_name: String,
    },

    #[error("Failed to read structure '{path}': {source}", path = path.display())]
    Structure {
        path: PathBuf,
        #[source]
        source: PdbError,
    },
}

/// Anything that names an ordered list of residues.
pub trait ResidueSelector {
    fn selected_residues(&self) -> Vec<ResidueRef>;
}

impl ResidueSelector for Contig {
    fn selected_residues(&self) -> Vec<ResidueRef> {
        self.to_residues()
    }
}

impl ResidueSelector for MotifIndexSet {
    fn selected_residues(&self) -> Vec<ResidueRef> {
        self.residues().to_vec()
    }
}

impl ResidueSelector for [ResidueRef] {
    fn selected_residues(&self) -> Vec<ResidueRef> {
        self.to_vec()
    }
}

impl ResidueSelector for Vec<ResidueRef> {
    fn selected_residues(&self) -> Vec<ResidueRef> {
        self.clone()
    }
}

pub fn load_structure(path: &Path) -> Result<Structure, SelectionError> {
    PdbFile::read_from_path(path)
        .map(|(structure, _)| structure)
        .map_err(|source| SelectionError::Structure {
            path: path.to_path_buf(),
            source,
        })
}

/// Loads `structure_path` and extracts the selected residues' atoms.
pub fn extract<S: ResidueSelector + ?Sized>(
    selector: &S,
    structure_path: &Path,
    atom_part: AtomPart,
) -> Result<CoordinateFrame, SelectionError> {
    let structure = load_structure(structure_path)?;
    extract_from(
        selector,
        &structure,
        atom_part,
        &structure_path.display().to_string(),
    )
}

/// Extracts the selected residues' atoms from an already loaded structure.
///
/// Fails on the first residue (or required atom) that the structure lacks, so
/// numbering disagreements between reference and design surface immediately.
pub fn extract_from<S: ResidueSelector + ?Sized>(
    selector: &S,
    structure: &Structure,
    atom_part: AtomPart,
    source_name: &str,
) -> Result<CoordinateFrame, SelectionError> {
    let mut frame = CoordinateFrame::new(source_name, atom_part);
    for (ordinal, residue_ref) in selector.selected_residues().into_iter().enumerate() {
        let residue = structure
            .find_residue(residue_ref.chain, residue_ref.number)
            .ok_or_else(|| SelectionError::ResidueNotFound {
                chain: residue_ref.chain,
                number: residue_ref.number,
                source_name: source_name.to_string(),
            })?;
        for &atom_name in atom_part.atom_names() {
            let atom = residue
                .atom(atom_name)
                .ok_or_else(|| SelectionError::AtomNotFound {
                    residue: residue_ref,
                    atom: atom_name.to_string(),
                    source_name: source_name.to_string(),
                })?;
            frame.push(
                FrameAtom {
                    residue: residue_ref,
                    ordinal,
                    atom_name: atom_name.to_string(),
                },
                atom.position,
            );
        }
    }
    Ok(frame)
}

/// Extracts every residue of the structure in file order.
///
/// Residues lacking one of the requested atoms are skipped, mirroring how
/// backbone feature arrays ignore incomplete residues.
pub fn whole_structure(structure: &Structure, atom_part: AtomPart, source_name: &str) -> CoordinateFrame {
    let mut frame = CoordinateFrame::new(source_name, atom_part);
    for (ordinal, residue) in structure.residues().enumerate() {
        let Some(chain) = structure.chain_name_of(residue) else {
            continue;
        };
        let atoms: Option<Vec<_>> = atom_part
            .atom_names()
            .iter()
            .map(|name| residue.atom(name))
            .collect();
        let Some(atoms) = atoms else {
            continue;
        };
        for atom in atoms {
            frame.push(
                FrameAtom {
                    residue: ResidueRef::new(chain, residue.number),
                    ordinal,
                    atom_name: atom.name.clone(),
                },
                atom.position,
            );
        }
    }
    frame
}
