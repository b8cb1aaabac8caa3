use super::parser::{Contig, MotifBlock, Segment};
use super::{ContigError, ResidueRef};
use std::collections::BTreeMap;

/// Ordered design-frame residues corresponding, position for position, to the
/// motif residues of the reference structure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MotifIndexSet {
    residues: Vec<ResidueRef>,
}

impl MotifIndexSet {
    pub fn new(residues: Vec<ResidueRef>) -> Self {
        Self { residues }
    }

    pub fn on_chain(chain: char, indices: &[isize]) -> Self {
        Self {
            residues: indices.iter().map(|&n| ResidueRef::new(chain, n)).collect(),
        }
    }

    pub fn residues(&self) -> &[ResidueRef] {
        &self.residues
    }

    pub fn indices(&self) -> Vec<isize> {
        self.residues.iter().map(|r| r.number).collect()
    }

    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    pub fn contains(&self, residue: &ResidueRef) -> bool {
        self.residues.contains(residue)
    }

    /// Splits the set per chain, each chain's positions sorted ascending.
    ///
    /// The design tool addresses fixed positions independently per chain, so a
    /// motif spanning several chains must be partitioned before a fixed-position
    /// directive can be built.
    pub fn partition_by_chain(&self) -> BTreeMap<char, Vec<isize>> {
        let mut by_chain: BTreeMap<char, Vec<isize>> = BTreeMap::new();
        for residue in &self.residues {
            by_chain.entry(residue.chain).or_default().push(residue.number);
        }
        for positions in by_chain.values_mut() {
            positions.sort_unstable();
            positions.dedup();
        }
        by_chain
    }

    /// Renders the set back into a motif-only contig.
    ///
    /// A new motif block starts at every chain change and every discontinuity in
    /// residue numbering (including backwards jumps), so that
    /// `to_contig().to_residues()` reproduces the original order exactly.
    pub fn to_contig(&self) -> Contig {
        Contig::new(
            runs(&self.residues)
                .into_iter()
                .map(Segment::Motif)
                .collect(),
        )
    }
}

impl Contig {
    /// Builds a motif-only contig from residue numbers on a single chain.
    pub fn from_indices(indices: &[isize], chain: char) -> Self {
        MotifIndexSet::on_chain(chain, indices).to_contig()
    }
}

fn runs(residues: &[ResidueRef]) -> Vec<MotifBlock> {
    let mut blocks: Vec<MotifBlock> = Vec::new();
    for residue in residues {
        match blocks.last_mut() {
            Some(block) if block.chain == residue.chain && block.end + 1 == residue.number => {
                block.end = residue.number;
            }
            _ => blocks.push(MotifBlock::single(residue.chain, residue.number)),
        }
    }
    blocks
}

/// Placement of motif residues inside a generated design.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignLayout {
    /// Design residue numbers occupied by the motif, in contig order.
    pub motif_indices: MotifIndexSet,
    /// Per-residue flag over the whole design (index 0 is residue 1).
    pub motif_mask: Vec<bool>,
}

impl DesignLayout {
    pub fn total_length(&self) -> usize {
        self.motif_mask.len()
    }
}

impl Contig {
    /// Lays the contig out on a single design chain numbered from 1.
    ///
    /// Scaffold gaps advance the residue cursor by their length. A sampled
    /// design has degenerate scaffold ranges; for a non-degenerate range the
    /// lower bound is used. Motif blocks occupy the next `len` residues.
    pub fn layout_design(&self, chain: char) -> DesignLayout {
        let mut cursor: isize = 1;
        let mut residues = Vec::with_capacity(self.motif_length());
        let mut motif_mask = Vec::new();

        for segment in self.segments() {
            match segment {
                Segment::Scaffold { min_len, .. } => {
                    cursor += *min_len as isize;
                    motif_mask.extend(std::iter::repeat_n(false, *min_len));
                }
                Segment::Motif(block) => {
                    for _ in 0..block.len() {
                        residues.push(ResidueRef::new(chain, cursor));
                        motif_mask.push(true);
                        cursor += 1;
                    }
                }
            }
        }

        DesignLayout {
            motif_indices: MotifIndexSet::new(residues),
            motif_mask,
        }
    }
}

/// Pairs reference motif residues with design motif residues by position.
pub fn correspondence(
    reference: &Contig,
    design: &MotifIndexSet,
) -> Result<Vec<(ResidueRef, ResidueRef)>, ContigError> {
    let reference_residues = reference.to_residues();
    if reference_residues.len() != design.len() {
        return Err(ContigError::CorrespondenceMismatch {
            reference: reference_residues.len(),
            design: design.len(),
        });
    }
    Ok(reference_residues
        .into_iter()
        .zip(design.residues().iter().copied())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_through_contig_preserves_discontinuous_indices() {
        let indices = vec![32, 33, 34, 35, 86, 87, 88, 3, 10];
        let contig = Contig::from_indices(&indices, 'A');
        assert_eq!(contig.to_string(), "A32-35/A86-88/A3-3/A10-10");
        assert_eq!(contig.to_indices(), indices);
    }

    #[test]
    fn single_residue_runs_render_as_degenerate_ranges() {
        let contig = Contig::from_indices(&[5, 9], 'B');
        assert_eq!(contig.to_string(), "B5-5/B9-9");
    }

    #[test]
    fn chain_change_starts_a_new_block() {
        let set = MotifIndexSet::new(vec![
            ResidueRef::new('A', 1),
            ResidueRef::new('A', 2),
            ResidueRef::new('B', 3),
        ]);
        assert_eq!(set.to_contig().to_string(), "A1-2/B3-3");
        assert_eq!(set.to_contig().to_residues(), set.residues());
    }

    #[test]
    fn layout_places_motif_after_scaffold_gaps() {
        let contig = Contig::parse("31-31/B25-46/32-32/A32/A4/A5").unwrap();
        let layout = contig.layout_design('A');

        let indices = layout.motif_indices.indices();
        assert_eq!(indices.len(), 25);
        assert_eq!(indices[0], 32);
        assert_eq!(indices[21], 53);
        assert_eq!(&indices[22..], &[86, 87, 88]);
        assert_eq!(layout.total_length(), 88);
        assert_eq!(layout.motif_mask.iter().filter(|&&m| m).count(), 25);
        assert!(!layout.motif_mask[30]);
        assert!(layout.motif_mask[31]);
    }

    #[test]
    fn empty_contig_lays_out_to_empty_motif() {
        let layout = Contig::default().layout_design('A');
        assert!(layout.motif_indices.is_empty());
        assert_eq!(layout.total_length(), 0);
    }

    #[test]
    fn partition_by_chain_sorts_each_chain_independently() {
        let set = MotifIndexSet::new(vec![
            ResidueRef::new('A', 9),
            ResidueRef::new('B', 4),
            ResidueRef::new('A', 2),
            ResidueRef::new('B', 1),
        ]);
        let parts = set.partition_by_chain();
        assert_eq!(parts[&'A'], vec![2, 9]);
        assert_eq!(parts[&'B'], vec![1, 4]);
    }

    #[test]
    fn correspondence_requires_equal_motif_lengths() {
        let reference = Contig::parse("A1-3").unwrap();
        let design = MotifIndexSet::on_chain('A', &[10, 11]);
        assert_eq!(
            correspondence(&reference, &design).unwrap_err(),
            ContigError::CorrespondenceMismatch {
                reference: 3,
                design: 2
            }
        );
    }
}
