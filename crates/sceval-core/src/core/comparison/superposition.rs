use super::ComparisonError;
use crate::core::selection::CoordinateFrame;
use nalgebra::{Matrix3, Point3, Vector3};

/// Optimal rigid-body transform mapping a mobile set onto a target set.
///
/// Apply with `rotation * p + translation`.
#[derive(Debug, Clone, PartialEq)]
pub struct Superposition {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
    pub rmsd: f64,
}

impl Superposition {
    pub fn apply(&self, p: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation * p.coords + self.translation)
    }
}

fn centroid(points: &[Point3<f64>]) -> Vector3<f64> {
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    sum / points.len() as f64
}

pub(crate) fn first_non_finite(points: &[Point3<f64>]) -> Option<usize> {
    points.iter().position(|p| !p.coords.iter().all(|c| c.is_finite()))
}

/// Kabsch superposition of `mobile` onto `target`.
///
/// The covariance `H = Σ m·tᵀ` of the centered sets is decomposed as
/// `H = U·S·Vᵀ` and the rotation taken as `R = V·D·Uᵀ`, where `D` flips the
/// axis of the smallest singular value when `det(V·Uᵀ) < 0` so that the
/// result is always a proper rotation.
pub fn superpose(
    mobile: &[Point3<f64>],
    target: &[Point3<f64>],
) -> Result<Superposition, ComparisonError> {
    if mobile.len() != target.len() {
        return Err(ComparisonError::LengthMismatch {
            left: mobile.len(),
            right: target.len(),
        });
    }
    if mobile.is_empty() {
        return Err(ComparisonError::Empty);
    }
    if let Some(index) = first_non_finite(mobile).or_else(|| first_non_finite(target)) {
        return Err(ComparisonError::NonFinite { index });
    }

    let mobile_center = centroid(mobile);
    let target_center = centroid(target);

    let mut h = Matrix3::zeros();
    for (m, t) in mobile.iter().zip(target) {
        h += (m.coords - mobile_center) * (t.coords - target_center).transpose();
    }

    let svd = h.svd(true, true);
    let u = svd.u.ok_or(ComparisonError::Decomposition)?;
    let v = svd.v_t.ok_or(ComparisonError::Decomposition)?.transpose();

    let mut rotation = v * u.transpose();
    if rotation.determinant() < 0.0 {
        let smallest = svd
            .singular_values
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(2);
        let mut flip = Matrix3::identity();
        flip[(smallest, smallest)] = -1.0;
        rotation = v * flip * u.transpose();
    }

    let translation = target_center - rotation * mobile_center;

    let sum_sq: f64 = mobile
        .iter()
        .zip(target)
        .map(|(m, t)| (rotation * m.coords + translation - t.coords).norm_squared())
        .sum();

    Ok(Superposition {
        rotation,
        translation,
        rmsd: (sum_sq / mobile.len() as f64).sqrt(),
    })
}

/// RMSD between two point sets after optimal superposition.
pub fn aligned_rmsd(a: &[Point3<f64>], b: &[Point3<f64>]) -> Result<f64, ComparisonError> {
    superpose(a, b).map(|s| s.rmsd)
}

/// RMSD between two frames after optimal superposition.
///
/// Frames must hold the same atom part and the same number of atoms; atoms are
/// paired by position.
pub fn rmsd(frame_a: &CoordinateFrame, frame_b: &CoordinateFrame) -> Result<f64, ComparisonError> {
    if frame_a.atom_part != frame_b.atom_part {
        return Err(ComparisonError::AtomPartMismatch {
            left: frame_a.name.clone(),
            right: frame_b.name.clone(),
        });
    }
    aligned_rmsd(frame_a.positions(), frame_b.positions())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::selection::AtomPart;
    use nalgebra::{Rotation3, Unit};

    const TOLERANCE: f64 = 1e-6;

    fn helix(n: usize) -> Vec<Point3<f64>> {
        (0..n)
            .map(|i| {
                let t = i as f64 * 100f64.to_radians();
                Point3::new(2.3 * t.cos(), 2.3 * t.sin(), 1.5 * i as f64)
            })
            .collect()
    }

    fn transformed(points: &[Point3<f64>]) -> Vec<Point3<f64>> {
        let axis = Unit::new_normalize(Vector3::new(0.3, -1.0, 0.7));
        let rot = Rotation3::from_axis_angle(&axis, 1.1);
        let shift = Vector3::new(12.0, -4.5, 30.0);
        points.iter().map(|p| rot * p + shift).collect()
    }

    #[test]
    fn identical_frames_have_zero_rmsd() {
        let pts = helix(25);
        let a = CoordinateFrame::from_positions("a", AtomPart::Representative, pts.clone());
        let b = CoordinateFrame::from_positions("b", AtomPart::Representative, pts);
        assert!(rmsd(&a, &b).unwrap() < TOLERANCE);
    }

    #[test]
    fn rigid_motion_is_removed() {
        let pts = helix(30);
        let moved = transformed(&pts);
        let fit = superpose(&moved, &pts).unwrap();
        assert!(fit.rmsd < TOLERANCE);
        assert!((fit.rotation.determinant() - 1.0).abs() < TOLERANCE);
        for (m, p) in moved.iter().zip(&pts) {
            assert!((fit.apply(m) - p).norm() < 1e-6);
        }
    }

    #[test]
    fn mirror_image_is_not_superposed_by_reflection() {
        let pts = helix(20);
        let mirrored: Vec<_> = pts.iter().map(|p| Point3::new(-p.x, p.y, p.z)).collect();
        let fit = superpose(&mirrored, &pts).unwrap();
        assert!(fit.rotation.determinant() > 0.0);
        assert!(fit.rmsd > 0.1);
    }

    #[test]
    fn rmsd_is_symmetric_and_reflects_real_deviation() {
        let pts = helix(12);
        let mut noisy = transformed(&pts);
        noisy[5].x += 1.0;
        let ab = aligned_rmsd(&pts, &noisy).unwrap();
        let ba = aligned_rmsd(&noisy, &pts).unwrap();
        assert!(ab > 0.05);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let a = helix(25);
        let b = helix(24);
        assert_eq!(
            aligned_rmsd(&a, &b),
            Err(ComparisonError::LengthMismatch { left: 25, right: 24 })
        );
    }

    #[test]
    fn non_finite_coordinates_are_rejected() {
        let a = helix(6);
        let mut b = transformed(&a);
        b[2] = Point3::new(f64::NAN, 0.0, 0.0);
        assert_eq!(aligned_rmsd(&a, &b), Err(ComparisonError::NonFinite { index: 2 }));
        b[2] = Point3::new(0.0, f64::INFINITY, 0.0);
        assert_eq!(aligned_rmsd(&b, &a), Err(ComparisonError::NonFinite { index: 2 }));
    }

    #[test]
    fn empty_sets_are_rejected() {
        assert_eq!(aligned_rmsd(&[], &[]), Err(ComparisonError::Empty));
    }

    #[test]
    fn frames_of_different_parts_are_rejected() {
        let pts = helix(4);
        let a = CoordinateFrame::from_positions("a", AtomPart::Representative, pts.clone());
        let b = CoordinateFrame::from_positions("b", AtomPart::Backbone, pts);
        assert!(matches!(
            rmsd(&a, &b),
            Err(ComparisonError::AtomPartMismatch { .. })
        ));
    }
}
