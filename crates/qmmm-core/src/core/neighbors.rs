use super::models::atom::ChargeGroup;
use super::models::topology::Topology;
use super::pbc::PbcError;
use super::pbc::cell::SimulationBox;
use super::pbc::shift::ShiftIndex;
use nalgebra::Point3;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// One i-particle entry of the QM/MM short-range neighbor list.
///
/// The j-particles lie within the cutoff of the i-particle translated by `shift`, so
/// the image of a j-particle next to the i-particle is `x_j - shift_vector(shift)`.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborRow {
    pub i_particle: usize,
    pub shift: ShiftIndex,
    pub j_particles: Vec<usize>,
}

/// The classical short-range neighbor list restricted to QM atoms as i-particles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeighborList {
    rows: Vec<NeighborRow>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NeighborListError {
    #[error("Cutoff must be positive and finite, got {0}")]
    InvalidCutoff(f64),
    #[error("Atom index {index} is out of range for {atom_count} positions")]
    AtomOutOfRange { index: usize, atom_count: usize },
    #[error("Periodic boundary error: {0}")]
    Pbc(#[from] PbcError),
}

impl NeighborList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_row(&mut self, i_particle: usize, shift: ShiftIndex, j_particles: Vec<usize>) {
        self.rows.push(NeighborRow {
            i_particle,
            shift,
            j_particles,
        });
    }

    pub fn rows(&self) -> &[NeighborRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Builds the list by brute force over charge groups.
    ///
    /// Each charge group is represented by its lowest-indexed atom (for QM groups, its
    /// lowest-indexed QM atom). A whole j-group enters a row when its representative lies
    /// within `cutoff` of the i-representative's minimum image, and the row's shift is the
    /// one that brings the j-group next to the i-particle. Every QM representative gets a
    /// central row even when it has no neighbors, so all of them act as i-particles.
    pub fn build(
        topology: &Topology,
        positions: &[Point3<f64>],
        sim_box: &SimulationBox,
        qm_atoms: &[usize],
        cutoff: f64,
    ) -> Result<Self, NeighborListError> {
        if !cutoff.is_finite() || cutoff <= 0.0 {
            return Err(NeighborListError::InvalidCutoff(cutoff));
        }
        let atom_count = topology.len().min(positions.len());
        let check = |index: usize| {
            if index < atom_count {
                Ok(index)
            } else {
                Err(NeighborListError::AtomOutOfRange { index, atom_count })
            }
        };

        let mut groups: BTreeMap<usize, (ChargeGroup, Vec<usize>)> = BTreeMap::new();
        let mut representative_of: HashMap<ChargeGroup, usize> = HashMap::new();
        for index in 0..atom_count {
            let group = topology.charge_group(index);
            let rep = *representative_of.entry(group).or_insert(index);
            groups.entry(rep).or_insert_with(|| (group, Vec::new())).1.push(index);
        }

        let mut qm_representatives: HashMap<ChargeGroup, usize> = HashMap::new();
        for &index in qm_atoms {
            let index = check(index)?;
            let group = topology.charge_group(index);
            qm_representatives
                .entry(group)
                .and_modify(|rep| *rep = (*rep).min(index))
                .or_insert(index);
        }
        let mut i_particles: Vec<(usize, ChargeGroup)> = qm_representatives
            .into_iter()
            .map(|(group, rep)| (rep, group))
            .collect();
        i_particles.sort_unstable_by_key(|&(rep, _)| rep);

        let mut list = NeighborList::new();
        for (i_rep, i_group) in i_particles {
            let mut rows: BTreeMap<ShiftIndex, Vec<usize>> = BTreeMap::new();
            rows.insert(ShiftIndex::CENTRAL, Vec::new());
            for (&j_rep, (j_group, members)) in &groups {
                if *j_group == i_group {
                    continue;
                }
                let (dx, shift) = sim_box.minimum_image(&positions[i_rep], &positions[j_rep])?;
                if dx.norm() < cutoff {
                    rows.entry(shift).or_default().extend(members.iter().copied());
                }
            }
            for (shift, j_particles) in rows {
                if shift.is_central() || !j_particles.is_empty() {
                    list.push_row(i_rep, shift, j_particles);
                }
            }
        }
        Ok(list)
    }
}
