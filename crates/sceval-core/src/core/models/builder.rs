use super::atom::Atom;
use super::ids::{ChainId, ResidueId};
use super::structure::Structure;

/// Builds a [`Structure`] from a stream of atom records.
///
/// A new residue starts whenever the chain, residue number or insertion code
/// changes between consecutive records.
#[derive(Debug, Default)]
pub struct StructureBuilder {
    structure: Structure,
    current_chain: Option<(char, ChainId)>,
    current_residue: Option<((isize, Option<char>), ResidueId)>,
}

impl StructureBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_chain(&mut self, id: char) -> &mut Self {
        let chain_id = self.structure.add_chain(id);
        self.current_chain = Some((id, chain_id));
        self.current_residue = None;
        self
    }

    pub fn start_residue(
        &mut self,
        number: isize,
        insertion_code: Option<char>,
        name: &str,
    ) -> &mut Self {
        if let Some((_, chain_id)) = self.current_chain {
            self.current_residue = self
                .structure
                .add_residue(chain_id, number, insertion_code, name)
                .map(|id| ((number, insertion_code), id));
        }
        self
    }

    /// Routes one atom record, opening chains and residues as needed.
    pub fn push_atom(
        &mut self,
        chain: char,
        residue_number: isize,
        insertion_code: Option<char>,
        residue_name: &str,
        atom: Atom,
    ) -> &mut Self {
        if self.current_chain.map(|(id, _)| id) != Some(chain) {
            self.start_chain(chain);
        }
        if self.current_residue.map(|(key, _)| key) != Some((residue_number, insertion_code)) {
            self.start_residue(residue_number, insertion_code, residue_name);
        }
        if let Some((_, residue_id)) = self.current_residue {
            self.structure.add_atom(residue_id, atom);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.structure.atom_count() == 0
    }

    pub fn build(self) -> Structure {
        self.structure
    }
}
