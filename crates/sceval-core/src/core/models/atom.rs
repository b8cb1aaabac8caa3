use nalgebra::Point3;

/// Backbone atom names in the order they are extracted for full-backbone frames.
pub const BACKBONE_ATOM_NAMES: [&str; 4] = ["N", "CA", "C", "O"];

/// Name of the single representative atom of a residue.
pub const REPRESENTATIVE_ATOM_NAME: &str = "CA";

/// An atom record from a coordinate file.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Serial number from the source file.
    pub serial: usize,
    /// Atom name (e.g., "CA", "N", "O").
    pub name: String,
    /// Element symbol, possibly empty when the source omits it.
    pub element: String,
    /// Cartesian coordinates in Angstroms.
    pub position: Point3<f64>,
    /// Occupancy column.
    pub occupancy: f64,
    /// Temperature factor column; prediction tools store per-residue confidence here.
    pub b_factor: f64,
    /// Whether the atom came from a HETATM record.
    pub is_hetero: bool,
}

impl Atom {
    pub fn new(serial: usize, name: &str, position: Point3<f64>) -> Self {
        Self {
            serial,
            name: name.to_string(),
            element: String::new(),
            position,
            occupancy: 1.0,
            b_factor: 0.0,
            is_hetero: false,
        }
    }

    pub fn is_backbone(&self) -> bool {
        BACKBONE_ATOM_NAMES.contains(&self.name.as_str())
    }
}
