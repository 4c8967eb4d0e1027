use super::PbcError;
use super::shift::{NUM_SHIFTS, ShiftIndex};
use nalgebra::{Point3, Vector3};

/// A periodic simulation box described by three lattice vectors.
///
/// The vectors follow the classical engine's lower-triangular convention: `a` lies
/// along x, `b` lies in the xy-plane and `c` is arbitrary, with strictly positive
/// diagonal elements. Rectangular boxes are the special case with zero off-diagonals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationBox {
    vectors: [Vector3<f64>; 3],
}

impl SimulationBox {
    /// Creates a rectangular box with the given edge lengths (nm).
    pub fn rectangular(x: f64, y: f64, z: f64) -> Result<Self, PbcError> {
        Self::triclinic(
            Vector3::new(x, 0.0, 0.0),
            Vector3::new(0.0, y, 0.0),
            Vector3::new(0.0, 0.0, z),
        )
    }

    /// Creates a box from three lattice vectors in lower-triangular form.
    ///
    /// # Errors
    ///
    /// Returns [`PbcError::InvalidBoxVector`] if a vector has a non-positive diagonal
    /// element, a non-zero upper-triangular element, or a non-finite component.
    pub fn triclinic(a: Vector3<f64>, b: Vector3<f64>, c: Vector3<f64>) -> Result<Self, PbcError> {
        let vectors = [a, b, c];
        for (index, v) in vectors.iter().enumerate() {
            let finite = v.iter().all(|x| x.is_finite());
            let upper_clear = v.iter().skip(index + 1).all(|&x| x == 0.0);
            if !finite || !upper_clear || v[index] <= 0.0 {
                return Err(PbcError::InvalidBoxVector {
                    index,
                    vector: [v.x, v.y, v.z],
                });
            }
        }
        Ok(Self { vectors })
    }

    pub fn vectors(&self) -> &[Vector3<f64>; 3] {
        &self.vectors
    }

    pub fn is_rectangular(&self) -> bool {
        self.vectors[1].x == 0.0 && self.vectors[2].x == 0.0 && self.vectors[2].y == 0.0
    }

    /// The Cartesian translation encoded by a shift index.
    pub fn shift_vector(&self, shift: ShiftIndex) -> Vector3<f64> {
        let cell = shift.cell();
        self.vectors[0] * cell.x as f64
            + self.vectors[1] * cell.y as f64
            + self.vectors[2] * cell.z as f64
    }

    /// The full shift-vector table, indexed by [`ShiftIndex::index`].
    pub fn shift_vectors(&self) -> Vec<Vector3<f64>> {
        (0..NUM_SHIFTS)
            .filter_map(ShiftIndex::from_index)
            .map(|shift| self.shift_vector(shift))
            .collect()
    }

    /// Computes the minimum-image separation `x1 - x2` and its shift index.
    ///
    /// The returned vector satisfies `dx = x1 - x2 + shift_vector(shift)`, so the image
    /// of `x2` closest to `x1` is `x2 - shift_vector(shift)`. Each component is reduced
    /// into the half-open interval `(-L/2, L/2]`, walking the box vectors from z down to
    /// x so that triclinic off-diagonals are folded correctly.
    ///
    /// # Errors
    ///
    /// Returns [`PbcError::NonFiniteCoordinate`] for non-finite input and
    /// [`PbcError::ShiftOutOfRange`] if the positions are so far apart that the required
    /// translation is not addressable by a shift index.
    pub fn minimum_image(
        &self,
        x1: &Point3<f64>,
        x2: &Point3<f64>,
    ) -> Result<(Vector3<f64>, ShiftIndex), PbcError> {
        let mut dx = x1 - x2;
        if !dx.iter().all(|x| x.is_finite()) {
            return Err(PbcError::NonFiniteCoordinate);
        }

        let mut cell = Vector3::<i32>::zeros();
        for d in (0..3).rev() {
            let length = self.vectors[d][d];
            let half = 0.5 * length;

            let n = (dx[d] / length).round();
            if n != 0.0 {
                dx -= self.vectors[d] * n;
                cell[d] -= n as i32;
            }
            if dx[d] > half {
                dx -= self.vectors[d];
                cell[d] -= 1;
            } else if dx[d] <= -half {
                dx += self.vectors[d];
                cell[d] += 1;
            }
        }

        Ok((dx, ShiftIndex::from_cell(cell)?))
    }

    /// Minimum-image distance between two positions.
    pub fn distance(&self, x1: &Point3<f64>, x2: &Point3<f64>) -> Result<f64, PbcError> {
        self.minimum_image(x1, x2).map(|(dx, _)| dx.norm())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn cubic(length: f64) -> SimulationBox {
        SimulationBox::rectangular(length, length, length).unwrap()
    }

    #[test]
    fn rectangular_box_is_recognized() {
        let b = cubic(3.0);
        assert!(b.is_rectangular());
        assert_eq!(b.vectors()[1], Vector3::new(0.0, 3.0, 0.0));
    }

    #[test]
    fn triclinic_rejects_upper_triangular_components() {
        let result = SimulationBox::triclinic(
            Vector3::new(3.0, 0.5, 0.0),
            Vector3::new(0.0, 3.0, 0.0),
            Vector3::new(0.0, 0.0, 3.0),
        );
        assert!(matches!(
            result,
            Err(PbcError::InvalidBoxVector { index: 0, .. })
        ));
    }

    #[test]
    fn triclinic_rejects_non_positive_diagonal() {
        let result = SimulationBox::rectangular(3.0, 0.0, 3.0);
        assert!(matches!(
            result,
            Err(PbcError::InvalidBoxVector { index: 1, .. })
        ));
    }

    #[test]
    fn shift_vector_combines_box_vectors() {
        let b = SimulationBox::triclinic(
            Vector3::new(3.0, 0.0, 0.0),
            Vector3::new(1.0, 3.0, 0.0),
            Vector3::new(0.5, 0.5, 3.0),
        )
        .unwrap();
        let shift = ShiftIndex::from_cell(Vector3::new(1, -1, 1)).unwrap();
        assert_eq!(b.shift_vector(shift), Vector3::new(2.5, -2.5, 3.0));
        assert_eq!(b.shift_vector(ShiftIndex::CENTRAL), Vector3::zeros());
        assert_eq!(b.shift_vectors().len(), NUM_SHIFTS);
    }

    #[test]
    fn minimum_image_wraps_across_boundary() {
        let b = cubic(3.0);
        let qm = Point3::origin();
        let mm = Point3::new(3.1, 0.0, 0.0);

        let (dx, shift) = b.minimum_image(&qm, &mm).unwrap();
        assert!((dx - Vector3::new(-0.1, 0.0, 0.0)).norm() < TOLERANCE);
        assert_eq!(shift.cell(), Vector3::new(1, 0, 0));

        let image = mm - b.shift_vector(shift);
        assert!((image - Point3::new(0.1, 0.0, 0.0)).norm() < TOLERANCE);
    }

    #[test]
    fn minimum_image_within_half_box_uses_central_shift() {
        let b = cubic(3.0);
        let (dx, shift) = b
            .minimum_image(&Point3::new(1.0, 1.0, 1.0), &Point3::new(0.5, 1.2, 0.0))
            .unwrap();
        assert!(shift.is_central());
        assert!((dx - Vector3::new(0.5, -0.2, 1.0)).norm() < TOLERANCE);
    }

    #[test]
    fn minimum_image_folds_triclinic_offsets() {
        let b = SimulationBox::triclinic(
            Vector3::new(3.0, 0.0, 0.0),
            Vector3::new(1.0, 3.0, 0.0),
            Vector3::new(0.0, 0.0, 3.0),
        )
        .unwrap();
        let x1 = Point3::new(0.0, 0.0, 0.0);
        let x2 = Point3::new(1.2, 2.9, 0.0);

        let (dx, shift) = b.minimum_image(&x1, &x2).unwrap();
        assert_eq!(shift.cell(), Vector3::new(0, 1, 0));
        assert!((dx - (x1 - x2 + b.shift_vector(shift))).norm() < TOLERANCE);
        assert!(dx.y.abs() <= 1.5);
    }

    #[test]
    fn minimum_image_is_invariant_under_box_translation() {
        let b = cubic(3.0);
        let x1 = Point3::new(0.2, 2.8, 1.0);
        let x2 = Point3::new(2.9, 0.1, 1.4);
        let period = b.vectors()[0] + b.vectors()[2];

        let (dx, shift) = b.minimum_image(&x1, &x2).unwrap();
        let (dx_moved, shift_moved) = b.minimum_image(&(x1 + period), &(x2 + period)).unwrap();
        assert_eq!(shift, shift_moved);
        assert!((dx - dx_moved).norm() < 1e-9);
    }

    #[test]
    fn minimum_image_reports_unreachable_translation() {
        let b = cubic(1.0);
        let result = b.minimum_image(&Point3::origin(), &Point3::new(0.0, 5.0, 0.0));
        assert!(matches!(result, Err(PbcError::ShiftOutOfRange { .. })));
    }

    #[test]
    fn minimum_image_rejects_non_finite_input() {
        let b = cubic(3.0);
        let result = b.minimum_image(&Point3::new(f64::NAN, 0.0, 0.0), &Point3::origin());
        assert_eq!(result, Err(PbcError::NonFiniteCoordinate));
    }

    #[test]
    fn distance_uses_nearest_image() {
        let b = cubic(3.0);
        let d = b
            .distance(&Point3::new(0.1, 0.0, 0.0), &Point3::new(2.9, 0.0, 0.0))
            .unwrap();
        assert!((d - 0.2).abs() < 1e-9);
    }
}
