use crate::core::pbc::cell::SimulationBox;
use crate::core::pbc::shift::ShiftIndex;
use nalgebra::Point3;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvironmentError {
    #[error("No position available for MM atom {index}")]
    MissingPosition { index: usize },
    #[error("No classical charge available for MM atom {index}")]
    MissingCharge { index: usize },
}

/// The MM atoms that act as point charges on the QM subsystem during one step.
///
/// All four per-atom sequences are parallel. Membership is rebuilt every step from the
/// filtered neighbor-list candidates; in the ONIOM scheme the environment stays empty.
#[derive(Debug, Clone, PartialEq)]
pub struct MmEnvironment {
    scale_factor: f64,
    atom_indices: Vec<usize>,
    shifts: Vec<ShiftIndex>,
    scaled_charges: Vec<f64>,
    shifted_coordinates: Vec<Point3<f64>>,
}

impl MmEnvironment {
    /// Creates an empty environment whose charges will be scaled by `scale_factor`.
    pub fn new(scale_factor: f64) -> Self {
        Self {
            scale_factor,
            atom_indices: Vec::new(),
            shifts: Vec::new(),
            scaled_charges: Vec::new(),
            shifted_coordinates: Vec::new(),
        }
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn atom_indices(&self) -> &[usize] {
        &self.atom_indices
    }

    pub fn shifts(&self) -> &[ShiftIndex] {
        &self.shifts
    }

    pub fn scaled_charges(&self) -> &[f64] {
        &self.scaled_charges
    }

    pub fn shifted_coordinates(&self) -> &[Point3<f64>] {
        &self.shifted_coordinates
    }

    pub fn len(&self) -> usize {
        self.atom_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atom_indices.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.atom_indices.clear();
        self.shifts.clear();
        self.scaled_charges.clear();
        self.shifted_coordinates.clear();
    }

    /// Replaces the membership with `members`, given as `(global index, shift)` pairs.
    ///
    /// The caller is responsible for filtering and deduplication. On error the
    /// environment is left empty.
    pub(crate) fn rebuild<I>(
        &mut self,
        members: I,
        charges: &[f64],
        positions: &[Point3<f64>],
        sim_box: &SimulationBox,
    ) -> Result<(), EnvironmentError>
    where
        I: IntoIterator<Item = (usize, ShiftIndex)>,
    {
        self.clear();
        for (index, shift) in members {
            if let Err(err) = self.push(index, shift, charges, positions, sim_box) {
                self.clear();
                return Err(err);
            }
        }
        Ok(())
    }

    fn push(
        &mut self,
        index: usize,
        shift: ShiftIndex,
        charges: &[f64],
        positions: &[Point3<f64>],
        sim_box: &SimulationBox,
    ) -> Result<(), EnvironmentError> {
        let charge = charges
            .get(index)
            .ok_or(EnvironmentError::MissingCharge { index })?;
        let position = positions
            .get(index)
            .ok_or(EnvironmentError::MissingPosition { index })?;
        self.atom_indices.push(index);
        self.shifts.push(shift);
        self.scaled_charges.push(charge * self.scale_factor);
        self.shifted_coordinates
            .push(position - sim_box.shift_vector(shift));
        Ok(())
    }
}
