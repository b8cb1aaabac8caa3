use super::atom::{Atom, REPRESENTATIVE_ATOM_NAME};
use super::chain::Chain;
use super::ids::{ChainId, ResidueId};
use super::residue::Residue;
use nalgebra::Point3;
use slotmap::SlotMap;
use std::collections::{BTreeSet, HashMap};

/// A protein structure: chains of residues of atoms.
///
/// Residues are addressable by `(chain identifier, residue number)`, which is
/// how contigs refer to them. When a file carries insertion codes, the first
/// residue with a given number answers the lookup.
#[derive(Debug, Clone, Default)]
pub struct Structure {
    /// Primary storage for chains.
    chains: SlotMap<ChainId, Chain>,
    /// Primary storage for residues.
    residues: SlotMap<ResidueId, Residue>,
    /// Chains in the order they first appear in the file.
    chain_order: Vec<ChainId>,
    /// Lookup map for chains by their single-character identifier.
    chain_id_map: HashMap<char, ChainId>,
    /// Lookup map for residues by chain and residue number.
    residue_id_map: HashMap<(ChainId, isize), ResidueId>,
}

impl Structure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the chain with this identifier, creating it if needed.
    pub fn add_chain(&mut self, id: char) -> ChainId {
        if let Some(&chain_id) = self.chain_id_map.get(&id) {
            return chain_id;
        }
        let chain_id = self.chains.insert(Chain::new(id));
        self.chain_order.push(chain_id);
        self.chain_id_map.insert(id, chain_id);
        chain_id
    }

    /// Appends a residue to a chain. Returns `None` if the chain does not exist.
    pub fn add_residue(
        &mut self,
        chain_id: ChainId,
        number: isize,
        insertion_code: Option<char>,
        name: &str,
    ) -> Option<ResidueId> {
        let chain = self.chains.get_mut(chain_id)?;
        let mut residue = Residue::new(number, name, chain_id);
        residue.insertion_code = insertion_code;
        let residue_id = self.residues.insert(residue);
        chain.residues.push(residue_id);
        self.residue_id_map
            .entry((chain_id, number))
            .or_insert(residue_id);
        Some(residue_id)
    }

    pub fn add_atom(&mut self, residue_id: ResidueId, atom: Atom) -> bool {
        match self.residues.get_mut(residue_id) {
            Some(residue) => {
                residue.add_atom(atom);
                true
            }
            None => false,
        }
    }

    pub fn chain(&self, id: ChainId) -> Option<&Chain> {
        self.chains.get(id)
    }

    pub fn chain_by_name(&self, id: char) -> Option<&Chain> {
        self.chain_id_map.get(&id).and_then(|&c| self.chains.get(c))
    }

    /// Chains in file order.
    pub fn chains(&self) -> impl Iterator<Item = &Chain> {
        self.chain_order.iter().filter_map(|&id| self.chains.get(id))
    }

    pub fn residue(&self, id: ResidueId) -> Option<&Residue> {
        self.residues.get(id)
    }

    pub fn find_residue(&self, chain: char, number: isize) -> Option<&Residue> {
        let chain_id = self.chain_id_map.get(&chain)?;
        let residue_id = self.residue_id_map.get(&(*chain_id, number))?;
        self.residues.get(*residue_id)
    }

    /// All residues in file order, chain by chain.
    pub fn residues(&self) -> impl Iterator<Item = &Residue> {
        self.chains()
            .flat_map(|chain| chain.residues.iter())
            .filter_map(|&id| self.residues.get(id))
    }

    /// Chain identifier of a residue.
    pub fn chain_name_of(&self, residue: &Residue) -> Option<char> {
        self.chains.get(residue.chain_id).map(|c| c.id)
    }

    pub fn residue_count(&self) -> usize {
        self.residues.len()
    }

    pub fn atom_count(&self) -> usize {
        self.residues.values().map(|r| r.atoms().len()).sum()
    }

    /// Distinct atom names present anywhere in the structure.
    pub fn atom_names(&self) -> BTreeSet<&str> {
        self.residues
            .values()
            .flat_map(|r| r.atoms().iter().map(|a| a.name.as_str()))
            .collect()
    }

    /// Structures with at most three distinct atom names are treated as
    /// CA-only traces.
    pub fn is_ca_only(&self) -> bool {
        self.atom_names().len() <= 3
    }

    /// One-letter sequence over all residues in file order.
    pub fn sequence(&self) -> String {
        self.residues().map(Residue::one_letter_code).collect()
    }

    /// Representative-atom positions for every residue that has one, in file order.
    pub fn ca_positions(&self) -> Vec<Point3<f64>> {
        self.residues()
            .filter_map(|r| r.atom(REPRESENTATIVE_ATOM_NAME))
            .map(|a| a.position)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_chain_structure() -> Structure {
        let mut s = Structure::new();
        let a = s.add_chain('A');
        let r1 = s.add_residue(a, 1, None, "GLY").unwrap();
        s.add_atom(r1, Atom::new(1, "N", Point3::new(0.0, 0.0, 0.0)));
        s.add_atom(r1, Atom::new(2, "CA", Point3::new(1.0, 0.0, 0.0)));
        let r2 = s.add_residue(a, 2, None, "ALA").unwrap();
        s.add_atom(r2, Atom::new(3, "CA", Point3::new(2.0, 0.0, 0.0)));
        let b = s.add_chain('B');
        let r3 = s.add_residue(b, 1, None, "TRP").unwrap();
        s.add_atom(r3, Atom::new(4, "CA", Point3::new(3.0, 0.0, 0.0)));
        s
    }

    #[test]
    fn find_residue_distinguishes_chains() {
        let s = two_chain_structure();
        assert_eq!(s.find_residue('A', 1).unwrap().name, "GLY");
        assert_eq!(s.find_residue('B', 1).unwrap().name, "TRP");
        assert!(s.find_residue('C', 1).is_none());
        assert!(s.find_residue('A', 3).is_none());
    }

    #[test]
    fn add_chain_is_idempotent_per_identifier() {
        let mut s = two_chain_structure();
        let before = s.chains().count();
        s.add_chain('A');
        assert_eq!(s.chains().count(), before);
    }

    #[test]
    fn sequence_and_positions_follow_file_order() {
        let s = two_chain_structure();
        assert_eq!(s.sequence(), "GAW");
        assert_eq!(s.ca_positions().len(), 3);
        assert_eq!(s.atom_count(), 4);
    }

    #[test]
    fn few_atom_names_mark_a_ca_only_trace() {
        let s = two_chain_structure();
        assert!(s.is_ca_only());
    }
}
