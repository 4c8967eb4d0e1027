use crate::core::pbc::shift::{NUM_SHIFTS, ShiftIndex};
use nalgebra::Vector3;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Force contribution for atom {index} is outside the {atom_count}-atom force array")]
pub struct ForceIndexError {
    pub index: usize,
    pub atom_count: usize,
}

/// The classical engine's per-atom force array and per-shift force table.
///
/// QM contributions are scattered into these arrays so that the classical engine can
/// fold them into its total forces and virial.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceAccumulator {
    forces: Vec<Vector3<f64>>,
    shift_forces: Vec<Vector3<f64>>,
}

impl ForceAccumulator {
    pub fn new(atom_count: usize) -> Self {
        Self {
            forces: vec![Vector3::zeros(); atom_count],
            shift_forces: vec![Vector3::zeros(); NUM_SHIFTS],
        }
    }

    pub fn forces(&self) -> &[Vector3<f64>] {
        &self.forces
    }

    pub fn shift_forces(&self) -> &[Vector3<f64>] {
        &self.shift_forces
    }

    pub fn shift_force(&self, shift: ShiftIndex) -> Vector3<f64> {
        self.shift_forces[shift.index()]
    }

    pub fn clear(&mut self) {
        self.forces.fill(Vector3::zeros());
        self.shift_forces.fill(Vector3::zeros());
    }

    /// Applies one atom's QM result: the gradient is subtracted from the atom's force
    /// and the shift force is added to the entry of the atom's periodic shift.
    pub fn accumulate(
        &mut self,
        index: usize,
        shift: ShiftIndex,
        gradient: &Vector3<f64>,
        shift_force: &Vector3<f64>,
    ) -> Result<(), ForceIndexError> {
        let atom_count = self.forces.len();
        let force = self
            .forces
            .get_mut(index)
            .ok_or(ForceIndexError { index, atom_count })?;
        *force -= gradient;
        self.shift_forces[shift.index()] += shift_force;
        Ok(())
    }
}
