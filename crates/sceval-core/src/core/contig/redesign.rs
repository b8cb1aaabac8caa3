use super::indices::{MotifIndexSet, correspondence};
use super::parser::{Contig, Segment};
use super::{ContigError, ResidueRef};
use std::collections::BTreeSet;

/// Design-frame motif positions whose identity may change during sequence
/// design while staying part of the structural motif comparison.
///
/// Always a subset of the [`MotifIndexSet`] it was resolved against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedesignSet {
    residues: BTreeSet<ResidueRef>,
}

impl RedesignSet {
    pub fn residues(&self) -> &BTreeSet<ResidueRef> {
        &self.residues
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    pub fn contains(&self, residue: &ResidueRef) -> bool {
        self.residues.contains(residue)
    }

    /// Builds a redesign set directly from design-frame residues.
    pub fn from_design(
        residues: impl IntoIterator<Item = ResidueRef>,
        motif: &MotifIndexSet,
    ) -> Result<Self, ContigError> {
        let residues: BTreeSet<_> = residues.into_iter().collect();
        if let Some(outside) = residues.iter().find(|r| !motif.contains(r)) {
            return Err(ContigError::RedesignOutsideMotif(*outside));
        }
        Ok(Self { residues })
    }

    /// Resolves redesign positions written in reference numbering
    /// (`A4;A6-7`) to the design residues they correspond to.
    pub fn from_reference(
        spec: &str,
        reference: &Contig,
        motif: &MotifIndexSet,
    ) -> Result<Self, ContigError> {
        let requested = parse_positions(spec)?;
        let pairs = correspondence(reference, motif)?;

        let mut residues = BTreeSet::new();
        for wanted in requested {
            let design = pairs
                .iter()
                .find(|(reference_residue, _)| *reference_residue == wanted)
                .map(|(_, design_residue)| *design_residue)
                .ok_or(ContigError::RedesignOutsideMotif(wanted))?;
            residues.insert(design);
        }
        Ok(Self { residues })
    }
}

fn parse_positions(spec: &str) -> Result<Vec<ResidueRef>, ContigError> {
    let joined = spec
        .split([';', ','])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    let contig = Contig::parse(&joined)?;
    let scaffold = contig
        .segments()
        .iter()
        .find(|s| matches!(s, Segment::Scaffold { .. }));
    if let Some(scaffold) = scaffold {
        return Err(ContigError::MissingChain(scaffold.to_string()));
    }
    Ok(contig.to_residues())
}

/// Removes redesignable positions from the fixed-position set handed to the
/// sequence design tool. Order of the remaining positions is preserved.
pub fn apply_redesign(motif: &MotifIndexSet, redesign: &RedesignSet) -> MotifIndexSet {
    MotifIndexSet::new(
        motif
            .residues()
            .iter()
            .filter(|r| !redesign.contains(r))
            .copied()
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn benchmark_case() -> (Contig, MotifIndexSet) {
        let design = Contig::parse("31-31/B25-46/32-32/A32/A4/A5").unwrap();
        let reference = design.motif_only();
        let layout = design.layout_design('A');
        (reference, layout.motif_indices)
    }

    #[test]
    fn reference_positions_map_to_design_positions() {
        let (reference, motif) = benchmark_case();
        let redesign = RedesignSet::from_reference("A4;B25-26", &reference, &motif).unwrap();
        let expected: BTreeSet<_> = [
            ResidueRef::new('A', 87),
            ResidueRef::new('A', 32),
            ResidueRef::new('A', 33),
        ]
        .into_iter()
        .collect();
        assert_eq!(redesign.residues(), &expected);
    }

    #[test]
    fn applying_redesign_never_keeps_redesigned_positions() {
        let (reference, motif) = benchmark_case();
        let redesign = RedesignSet::from_reference("A4;A5;B30-40", &reference, &motif).unwrap();
        let refined = apply_redesign(&motif, &redesign);

        assert_eq!(refined.len(), motif.len() - redesign.residues().len());
        assert!(refined.residues().iter().all(|r| !redesign.contains(r)));
        assert!(redesign.residues().iter().all(|r| motif.contains(r)));
    }

    #[test]
    fn redesign_outside_motif_is_rejected() {
        let (reference, motif) = benchmark_case();
        let err = RedesignSet::from_reference("A99", &reference, &motif).unwrap_err();
        assert_eq!(err, ContigError::RedesignOutsideMotif(ResidueRef::new('A', 99)));
    }

    #[test]
    fn design_frame_redesign_must_be_subset_of_motif() {
        let motif = MotifIndexSet::on_chain('A', &[1, 2, 3]);
        assert!(RedesignSet::from_design([ResidueRef::new('A', 2)], &motif).is_ok());
        assert!(RedesignSet::from_design([ResidueRef::new('A', 4)], &motif).is_err());
    }

    #[test]
    fn empty_redesign_keeps_every_position() {
        let motif = MotifIndexSet::on_chain('A', &[4, 5, 6]);
        assert_eq!(apply_redesign(&motif, &RedesignSet::default()), motif);
    }
}
