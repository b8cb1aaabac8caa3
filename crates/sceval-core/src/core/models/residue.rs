use super::atom::Atom;
use super::ids::ChainId;
use phf::phf_map;
use std::collections::HashMap;

static THREE_TO_ONE: phf::Map<&'static str, char> = phf_map! {
    "ALA" => 'A', "ARG" => 'R', "ASN" => 'N', "ASP" => 'D', "CYS" => 'C',
    "GLN" => 'Q', "GLU" => 'E', "GLY" => 'G', "HIS" => 'H', "ILE" => 'I',
    "LEU" => 'L', "LYS" => 'K', "MET" => 'M', "PHE" => 'F', "PRO" => 'P',
    "SER" => 'S', "THR" => 'T', "TRP" => 'W', "TYR" => 'Y', "VAL" => 'V',
    // Common variants written by modelling and prediction tools.
    "HSD" => 'H', "HSE" => 'H', "HSP" => 'H', "HIE" => 'H', "HID" => 'H',
    "HIP" => 'H', "CYX" => 'C', "MSE" => 'M', "SEC" => 'U', "PYL" => 'O',
};

/// Converts a three-letter residue name to its one-letter code, `X` if unknown.
pub fn one_letter_code(name: &str) -> char {
    THREE_TO_ONE
        .get(name.trim().to_ascii_uppercase().as_str())
        .copied()
        .unwrap_or('X')
}

#[derive(Debug, Clone, PartialEq)]
pub struct Residue {
    pub number: isize,                     // Residue sequence number from source file
    pub insertion_code: Option<char>,      // PDB insertion code, if any
    pub name: String,                      // Three-letter name (e.g., "ALA", "GLY")
    pub chain_id: ChainId,                 // Parent chain
    atoms: Vec<Atom>,                      // Atoms in file order
    atom_name_map: HashMap<String, usize>, // Atom name to index in `atoms`
}

impl Residue {
    pub(crate) fn new(number: isize, name: &str, chain_id: ChainId) -> Self {
        Self {
            number,
            insertion_code: None,
            name: name.to_string(),
            chain_id,
            atoms: Vec::new(),
            atom_name_map: HashMap::new(),
        }
    }

    /// Adds an atom; a second atom with the same name is kept in `atoms()` but
    /// name lookup keeps returning the first one.
    pub(crate) fn add_atom(&mut self, atom: Atom) {
        self.atom_name_map
            .entry(atom.name.clone())
            .or_insert(self.atoms.len());
        self.atoms.push(atom);
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom(&self, name: &str) -> Option<&Atom> {
        self.atom_name_map.get(name).map(|&i| &self.atoms[i])
    }

    pub fn one_letter_code(&self) -> char {
        one_letter_code(&self.name)
    }
}
