use crate::core::contig::ResidueRef;
use crate::core::models::atom::{BACKBONE_ATOM_NAMES, REPRESENTATIVE_ATOM_NAME};
use nalgebra::Point3;

/// Which atoms of each residue a frame contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomPart {
    /// The single representative atom (CA) per residue.
    Representative,
    /// N, CA, C, O per residue, in that order.
    Backbone,
}

const REPRESENTATIVE_ONLY: [&str; 1] = [REPRESENTATIVE_ATOM_NAME];

impl AtomPart {
    pub fn atom_names(&self) -> &'static [&'static str] {
        match self {
            AtomPart::Representative => &REPRESENTATIVE_ONLY,
            AtomPart::Backbone => &BACKBONE_ATOM_NAMES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameAtom {
    pub residue: ResidueRef,
    /// Position of the residue within the selection that produced the frame.
    pub ordinal: usize,
    pub atom_name: String,
}

/// Named, ordered atom coordinates with parallel identity metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateFrame {
    pub name: String,
    pub atom_part: AtomPart,
    positions: Vec<Point3<f64>>,
    atoms: Vec<FrameAtom>,
}

impl CoordinateFrame {
    pub fn new(name: &str, atom_part: AtomPart) -> Self {
        Self {
            name: name.to_string(),
            atom_part,
            positions: Vec::new(),
            atoms: Vec::new(),
        }
    }

    /// Builds an anonymous frame from bare positions; used for derived data.
    pub fn from_positions(name: &str, atom_part: AtomPart, positions: Vec<Point3<f64>>) -> Self {
        let atoms = (0..positions.len())
            .map(|i| FrameAtom {
                residue: ResidueRef::new('?', i as isize),
                ordinal: i,
                atom_name: String::new(),
            })
            .collect();
        Self {
            name: name.to_string(),
            atom_part,
            positions,
            atoms,
        }
    }

    pub(crate) fn push(&mut self, atom: FrameAtom, position: Point3<f64>) {
        self.atoms.push(atom);
        self.positions.push(position);
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn atoms(&self) -> &[FrameAtom] {
        &self.atoms
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Keeps atoms whose residue ordinal is flagged in `mask`; ordinals beyond
    /// the end of the mask are dropped.
    pub fn masked(&self, mask: &[bool]) -> Self {
        let mut out = Self::new(&self.name, self.atom_part);
        for (atom, position) in self.atoms.iter().zip(&self.positions) {
            if mask.get(atom.ordinal).copied().unwrap_or(false) {
                out.push(atom.clone(), *position);
            }
        }
        out
    }
}
