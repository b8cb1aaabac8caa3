use nalgebra::{Point3, Rotation3, Vector3};
use sceval::core::comparison::{ComparisonError, rmsd, similarity_score};
use sceval::core::contig::{Contig, MotifBlock};
use sceval::core::io::pdb::{PdbFile, PdbMetadata};
use sceval::core::io::traits::StructureFile;
use sceval::core::models::atom::Atom;
use sceval::core::models::builder::StructureBuilder;
use sceval::core::models::structure::Structure;
use sceval::core::selection::{AtomPart, SelectionError, extract, extract_from};

/// Two helical chains: A1..A40 and B20..B50, transformed by `place`.
fn two_chain_reference(place: impl Fn(Point3<f64>) -> Point3<f64>) -> Structure {
    let mut builder = StructureBuilder::new();
    let mut serial = 1;
    for (chain, first, last, shift) in [('A', 1, 40, 0.0), ('B', 20, 50, 12.0)] {
        for number in first..=last {
            let t = (number as f64) * 100f64.to_radians();
            let base = Point3::new(2.3 * t.cos() + shift, 2.3 * t.sin(), 1.5 * number as f64);
            for (k, name) in ["N", "CA", "C", "O"].iter().enumerate() {
                let offset = 0.45 * k as f64;
                let p = Point3::new(base.x + offset, base.y - 0.5 * offset, base.z + offset);
                builder.push_atom(chain, number, None, "GLY", Atom::new(serial, name, place(p)));
                serial += 1;
            }
        }
    }
    builder.build()
}

#[test]
fn multi_chain_contig_selects_motif_in_segment_order() {
    let contig = Contig::parse("31-31/B25-46/32-32/A32/A4/A5").unwrap();
    let blocks: Vec<MotifBlock> = contig.motif_blocks().copied().collect();
    assert_eq!(
        blocks,
        vec![
            MotifBlock::new('B', 25, 46).unwrap(),
            MotifBlock::single('A', 32),
            MotifBlock::single('A', 4),
            MotifBlock::single('A', 5),
        ]
    );
    assert_eq!(contig.motif_length(), 25);

    let reference = two_chain_reference(|p| p);
    let frame = extract_from(&contig, &reference, AtomPart::Representative, "reference").unwrap();
    assert_eq!(frame.len(), 25);
    let residues: Vec<_> = frame.atoms().iter().map(|a| a.residue.to_string()).collect();
    assert_eq!(residues[0], "B25");
    assert_eq!(residues[22..], ["A32", "A4", "A5"]);
}

#[test]
fn motif_read_back_from_disk_has_zero_rmsd_to_itself() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reference.pdb");
    PdbFile::write_to_path(&two_chain_reference(|p| p), &PdbMetadata::default(), &path).unwrap();

    let contig = Contig::parse("31-31/B25-46/32-32/A32/A4/A5").unwrap();
    let a = extract(&contig, &path, AtomPart::Backbone).unwrap();
    let b = extract(&contig, &path, AtomPart::Backbone).unwrap();
    assert_eq!(a.len(), 100);
    assert_eq!(format!("{:.3}", rmsd(&a, &b).unwrap()), "0.000");
}

#[test]
fn rigid_motion_leaves_rmsd_and_tm_score_unchanged() {
    let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), 1.1)
        * Rotation3::from_axis_angle(&Vector3::x_axis(), -0.4);
    let moved = two_chain_reference(|p| rotation * p + Vector3::new(30.0, -12.0, 4.0));
    let reference = two_chain_reference(|p| p);

    let contig = Contig::parse("B25-46/A32/A4/A5").unwrap();
    let a = extract_from(&contig, &reference, AtomPart::Backbone, "reference").unwrap();
    let b = extract_from(&contig, &moved, AtomPart::Backbone, "moved").unwrap();
    assert!(rmsd(&a, &b).unwrap() < 1e-6);

    let ca_a = reference.ca_positions();
    let ca_b = moved.ca_positions();
    let sequence = reference.sequence();
    let tm = similarity_score(&ca_a, &ca_b, &sequence, &sequence).unwrap();
    assert!((tm.score - 1.0).abs() < 1e-6);
}

#[test]
fn mismatched_selections_are_rejected() {
    let reference = two_chain_reference(|p| p);

    let missing = Contig::parse("10-10/A38-45").unwrap();
    let err = extract_from(&missing, &reference, AtomPart::Backbone, "reference").unwrap_err();
    assert!(matches!(
        err,
        SelectionError::ResidueNotFound { chain: 'A', number: 41, .. }
    ));

    let short = extract_from(&Contig::parse("A1-5").unwrap(), &reference, AtomPart::Representative, "r")
        .unwrap();
    let long = extract_from(&Contig::parse("A1-6").unwrap(), &reference, AtomPart::Representative, "r")
        .unwrap();
    assert_eq!(
        rmsd(&short, &long).unwrap_err(),
        ComparisonError::LengthMismatch { left: 5, right: 6 }
    );
}
