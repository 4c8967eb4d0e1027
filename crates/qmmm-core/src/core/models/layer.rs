use super::atom::ChargeGroup;
use super::topology::Topology;
use crate::core::pbc::cell::SimulationBox;
use crate::core::pbc::shift::ShiftIndex;
use crate::core::qm::method::LevelOfTheory;
use nalgebra::Point3;
use std::collections::HashSet;
use thiserror::Error;

/// Surface-hopping parameters of a layer.
///
/// These values are handed to the QM engine untouched; the coupling engine only
/// carries them from configuration to the layer and into low-level ONIOM copies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceHopping {
    pub cas_orbitals: u32,
    pub cas_electrons: u32,
    /// Number of state-averaging steps before switching to the single-state calculation.
    pub sa_steps: u32,
    pub sa_on: f64,
    pub sa_off: f64,
    /// Current state-averaging step counter.
    pub sa_step: u32,
}

/// The user-configured parameters of a QM layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerSettings {
    pub net_charge: i32,
    pub multiplicity: u32,
    pub level: LevelOfTheory,
    pub surface_hopping: Option<SurfaceHopping>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayerError {
    #[error("QM atom index {index} is out of range for a topology of {atom_count} atoms")]
    AtomOutOfRange { index: usize, atom_count: usize },
    #[error("A QM layer must contain at least one atom")]
    Empty,
    #[error("No position available for QM atom {index}")]
    MissingPosition { index: usize },
    #[error("Expected {expected} shifts for the layer, got {found}")]
    ShiftCountMismatch { expected: usize, found: usize },
}

/// One QM layer: a fixed set of atoms treated at a single level of theory.
///
/// Membership (`atom_indices`, `atomic_numbers`, `charge_groups`) is fixed at
/// construction. The periodic shifts and shifted coordinates are refreshed every step.
#[derive(Debug, Clone, PartialEq)]
pub struct QmLayer {
    atom_indices: Vec<usize>,
    atomic_numbers: Vec<u8>,
    charge_groups: Vec<ChargeGroup>,
    shifts: Vec<ShiftIndex>,
    shifted_coordinates: Vec<Point3<f64>>,
    settings: LayerSettings,
    electron_count: i64,
}

impl QmLayer {
    /// Builds a layer from global atom indices.
    ///
    /// Repeated indices are removed, keeping the first occurrence, so the resulting
    /// order is the input order with duplicates dropped. Shifts start out central and
    /// coordinates at the origin until the first refresh.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError::Empty`] for an empty index list and
    /// [`LayerError::AtomOutOfRange`] for an index the topology does not know.
    pub fn new(
        indices: &[usize],
        topology: &Topology,
        settings: LayerSettings,
    ) -> Result<Self, LayerError> {
        if indices.is_empty() {
            return Err(LayerError::Empty);
        }

        let mut seen = HashSet::with_capacity(indices.len());
        let mut atom_indices = Vec::with_capacity(indices.len());
        let mut atomic_numbers = Vec::with_capacity(indices.len());
        let mut charge_groups = Vec::with_capacity(indices.len());

        for &index in indices {
            if !seen.insert(index) {
                continue;
            }
            let atom = topology.atom(index).ok_or(LayerError::AtomOutOfRange {
                index,
                atom_count: topology.len(),
            })?;
            atom_indices.push(index);
            atomic_numbers.push(atom.atomic_number);
            charge_groups.push(topology.charge_group(index));
        }

        let nuclear_charge: i64 = atomic_numbers.iter().map(|&z| i64::from(z)).sum();
        let electron_count = nuclear_charge - i64::from(settings.net_charge);
        let len = atom_indices.len();

        Ok(Self {
            atom_indices,
            atomic_numbers,
            charge_groups,
            shifts: vec![ShiftIndex::CENTRAL; len],
            shifted_coordinates: vec![Point3::origin(); len],
            settings,
            electron_count,
        })
    }

    /// A copy of this layer re-expressed at the level of theory of `enclosing`.
    ///
    /// Atoms, shifts, coordinates, net charge, multiplicity and electron count are kept;
    /// the method, basis and surface-hopping parameters come from `enclosing`.
    pub fn with_level_of(&self, enclosing: &QmLayer) -> QmLayer {
        let mut copy = self.clone();
        copy.settings.level = enclosing.settings.level;
        copy.settings.surface_hopping = enclosing.settings.surface_hopping;
        copy
    }

    pub fn atom_indices(&self) -> &[usize] {
        &self.atom_indices
    }

    pub fn atomic_numbers(&self) -> &[u8] {
        &self.atomic_numbers
    }

    pub fn charge_groups(&self) -> &[ChargeGroup] {
        &self.charge_groups
    }

    pub fn shifts(&self) -> &[ShiftIndex] {
        &self.shifts
    }

    pub fn shifted_coordinates(&self) -> &[Point3<f64>] {
        &self.shifted_coordinates
    }

    pub fn settings(&self) -> &LayerSettings {
        &self.settings
    }

    pub fn level(&self) -> LevelOfTheory {
        self.settings.level
    }

    pub fn net_charge(&self) -> i32 {
        self.settings.net_charge
    }

    pub fn multiplicity(&self) -> u32 {
        self.settings.multiplicity
    }

    pub fn surface_hopping(&self) -> Option<&SurfaceHopping> {
        self.settings.surface_hopping.as_ref()
    }

    pub fn electron_count(&self) -> i64 {
        self.electron_count
    }

    pub fn len(&self) -> usize {
        self.atom_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atom_indices.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.atom_indices.contains(&index)
    }

    pub(crate) fn set_shifts(&mut self, shifts: Vec<ShiftIndex>) -> Result<(), LayerError> {
        if shifts.len() != self.atom_indices.len() {
            return Err(LayerError::ShiftCountMismatch {
                expected: self.atom_indices.len(),
                found: shifts.len(),
            });
        }
        self.shifts = shifts;
        Ok(())
    }

    /// Recomputes the shifted coordinates from the current positions and shifts.
    pub(crate) fn refresh_coordinates(
        &mut self,
        positions: &[Point3<f64>],
        sim_box: &SimulationBox,
    ) -> Result<(), LayerError> {
        for ((coord, &index), &shift) in self
            .shifted_coordinates
            .iter_mut()
            .zip(&self.atom_indices)
            .zip(&self.shifts)
        {
            let position = positions
                .get(index)
                .ok_or(LayerError::MissingPosition { index })?;
            *coord = position - sim_box.shift_vector(shift);
        }
        Ok(())
    }
}
