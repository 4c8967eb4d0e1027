use super::config::CouplingScheme;
use super::error::QmmmError;
use crate::core::models::environment::MmEnvironment;
use crate::core::models::frame::Frame;
use crate::core::models::layer::QmLayer;
use crate::core::neighbors::NeighborList;
use crate::core::pbc::shift::ShiftIndex;
use tracing::{debug, instrument, trace};

/// An atom collected from the neighbor list together with its periodic shift
/// relative to the QM reference frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub index: usize,
    pub shift: ShiftIndex,
}

impl Candidate {
    pub fn new(index: usize, shift: ShiftIndex) -> Self {
        Self { index, shift }
    }
}

/// Sorts candidates by atom index and keeps only the first occurrence of each index.
///
/// The sort is stable, so among repeated indices the one encountered first in the
/// neighbor-list pass survives.
pub fn dedup_candidates(candidates: &mut Vec<Candidate>) {
    candidates.sort_by_key(|candidate| candidate.index);
    candidates.dedup_by_key(|candidate| candidate.index);
}

/// Reduces raw MM candidates to the point charges the QM solver should see.
///
/// After deduplication, candidates that are QM atoms or carry no charge in either
/// state are dropped. Applying the reduction to its own output changes nothing.
pub fn reduce_mm_candidates(candidates: &mut Vec<Candidate>, qm_mask: &[bool], frame: &Frame) {
    dedup_candidates(candidates);
    candidates.retain(|candidate| {
        let is_qm = qm_mask.get(candidate.index).copied().unwrap_or(false);
        !is_qm && !frame.is_uncharged(candidate.index)
    });
}

/// Rebuilds per-step shifts, shifted coordinates and the MM environment.
///
/// Candidate buffers are kept between steps so their capacity is reused.
#[derive(Debug, Default)]
pub struct EnvironmentUpdater {
    qm_candidates: Vec<Candidate>,
    mm_candidates: Vec<Candidate>,
}

impl EnvironmentUpdater {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refreshes `layers` and `environment` for the current step.
    ///
    /// Membership of the layers is never changed; only their shifts and shifted
    /// coordinates are rewritten. In the ONIOM scheme the environment is emptied.
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip_all, name = "environment_update", fields(step = step))]
    pub fn update(
        &mut self,
        scheme: CouplingScheme,
        layers: &mut [QmLayer],
        environment: &mut MmEnvironment,
        qm_mask: &[bool],
        frame: &Frame,
        neighbors: &NeighborList,
        step: u64,
    ) -> Result<(), QmmmError> {
        let layer_count = layers.len();
        match scheme {
            CouplingScheme::Normal => match layers {
                [layer] => self.update_normal(layer, environment, qm_mask, frame, neighbors, step),
                _ => Err(QmmmError::inconsistent(
                    step,
                    format!("the normal scheme expects one QM layer, found {layer_count}"),
                )),
            },
            CouplingScheme::Oniom => {
                environment.clear();
                for (index, layer) in layers.iter_mut().enumerate() {
                    update_oniom_layer(layer, frame).map_err(|message| {
                        QmmmError::inconsistent(step, format!("layer {index}: {message}"))
                    })?;
                }
                Ok(())
            }
        }
    }

    fn update_normal(
        &mut self,
        layer: &mut QmLayer,
        environment: &mut MmEnvironment,
        qm_mask: &[bool],
        frame: &Frame,
        neighbors: &NeighborList,
        step: u64,
    ) -> Result<(), QmmmError> {
        let inconsistent = |message: String| QmmmError::inconsistent(step, message);

        let Some(first) = neighbors.rows().first() else {
            return Err(inconsistent(
                "the neighbor list has no QM i-particles".to_string(),
            ));
        };
        let reference = first.i_particle;
        let reference_position = frame
            .positions
            .get(reference)
            .ok_or_else(|| inconsistent(format!("no position for QM atom {reference}")))?;

        self.qm_candidates.clear();
        self.mm_candidates.clear();

        for (row_index, row) in neighbors.rows().iter().enumerate() {
            let i = row.i_particle;
            if !qm_mask.get(i).copied().unwrap_or(false) {
                return Err(inconsistent(format!(
                    "neighbor-list i-particle {i} is not a QM atom"
                )));
            }
            let i_shift = if row_index == 0 {
                ShiftIndex::CENTRAL
            } else {
                let position = frame
                    .positions
                    .get(i)
                    .ok_or_else(|| inconsistent(format!("no position for QM atom {i}")))?;
                frame
                    .sim_box
                    .minimum_image(reference_position, position)
                    .map_err(|e| inconsistent(format!("QM atom {i}: {e}")))?
                    .1
            };
            self.qm_candidates.push(Candidate::new(i, i_shift));

            let j_shift = row.shift.compose(i_shift).map_err(|e| {
                inconsistent(format!("MM shift for neighbors of QM atom {i}: {e}"))
            })?;
            if let Some(&j) = row
                .j_particles
                .iter()
                .find(|&&j| j >= frame.atom_count())
            {
                return Err(inconsistent(format!(
                    "neighbor-list j-particle {j} of QM atom {i} is outside the {} atoms of the frame",
                    frame.atom_count()
                )));
            }
            self.mm_candidates.extend(
                row.j_particles
                    .iter()
                    .map(|&j| Candidate::new(j, j_shift)),
            );
        }

        trace!(
            i_particles = self.qm_candidates.len(),
            j_particles = self.mm_candidates.len(),
            "Collected raw neighbor-list candidates."
        );

        dedup_candidates(&mut self.qm_candidates);
        reduce_mm_candidates(&mut self.mm_candidates, qm_mask, frame);

        let shifts = assign_qm_shifts(layer, &self.qm_candidates).map_err(inconsistent)?;
        layer
            .set_shifts(shifts)
            .map_err(|e| inconsistent(e.to_string()))?;
        layer
            .refresh_coordinates(frame.positions, frame.sim_box)
            .map_err(|e| inconsistent(e.to_string()))?;

        environment
            .rebuild(
                self.mm_candidates.iter().map(|c| (c.index, c.shift)),
                frame.charges_a,
                frame.positions,
                frame.sim_box,
            )
            .map_err(|e| inconsistent(e.to_string()))?;

        debug!(
            qm_atoms = layer.len(),
            mm_atoms = environment.len(),
            "MM environment updated."
        );
        Ok(())
    }
}

/// Gives every layer atom the shift of its i-particle entry.
///
/// Atoms that never appear as i-particles take the shift of the most recent matched
/// atom, which must belong to the same charge group. Consecutive i-particles of one
/// charge group must agree on their shift.
fn assign_qm_shifts(layer: &QmLayer, i_particles: &[Candidate]) -> Result<Vec<ShiftIndex>, String> {
    let mut shifts = Vec::with_capacity(layer.len());
    let mut carried = None;

    for (&atom, &group) in layer.atom_indices().iter().zip(layer.charge_groups()) {
        match i_particles.binary_search_by_key(&atom, |candidate| candidate.index) {
            Ok(position) => {
                let shift = i_particles[position].shift;
                if let Some((carried_shift, carried_group)) = carried {
                    if carried_group == group && carried_shift != shift {
                        return Err(format!(
                            "QM atom {atom} has shift {shift} but its charge group was shifted by {carried_shift}"
                        ));
                    }
                }
                carried = Some((shift, group));
                shifts.push(shift);
            }
            Err(_) => match carried {
                Some((shift, carried_group)) if carried_group == group => shifts.push(shift),
                Some(_) => {
                    return Err(format!(
                        "QM atom {atom} is not an i-particle and does not share the charge group of the preceding i-particle"
                    ));
                }
                None => {
                    return Err(format!(
                        "QM atom {atom} is not an i-particle and no earlier QM atom provides a shift"
                    ));
                }
            },
        }
    }

    if let Some(stray) = i_particles
        .iter()
        .find(|candidate| !layer.contains(candidate.index))
    {
        return Err(format!(
            "neighbor-list i-particle {} is not part of the QM layer",
            stray.index
        ));
    }
    Ok(shifts)
}

/// Shifts every atom of an ONIOM layer next to the layer's first atom.
fn update_oniom_layer(layer: &mut QmLayer, frame: &Frame) -> Result<(), String> {
    let Some(&reference) = layer.atom_indices().first() else {
        return Ok(());
    };
    let reference_position = frame
        .positions
        .get(reference)
        .ok_or_else(|| format!("no position for QM atom {reference}"))?;

    let mut shifts = Vec::with_capacity(layer.len());
    shifts.push(ShiftIndex::CENTRAL);
    for &atom in &layer.atom_indices()[1..] {
        let position = frame
            .positions
            .get(atom)
            .ok_or_else(|| format!("no position for QM atom {atom}"))?;
        let (_, shift) = frame
            .sim_box
            .minimum_image(reference_position, position)
            .map_err(|e| format!("QM atom {atom}: {e}"))?;
        shifts.push(shift);
    }

    layer.set_shifts(shifts).map_err(|e| e.to_string())?;
    layer
        .refresh_coordinates(frame.positions, frame.sim_box)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::TopologyAtom;
    use crate::core::models::layer::LayerSettings;
    use crate::core::models::topology::Topology;
    use crate::core::pbc::cell::SimulationBox;
    use crate::core::qm::method::{LevelOfTheory, QmBasis, QmMethod};
    use nalgebra::{Point3, Vector3};

    const TOLERANCE: f64 = 1e-9;

    fn shift(x: i32, y: i32, z: i32) -> ShiftIndex {
        ShiftIndex::from_cell(Vector3::new(x, y, z)).unwrap()
    }

    fn settings() -> LayerSettings {
        LayerSettings {
            net_charge: 0,
            multiplicity: 1,
            level: LevelOfTheory::new(QmMethod::Rhf, QmBasis::Sto3G),
            surface_hopping: None,
        }
    }

    fn mask(len: usize, qm: &[usize]) -> Vec<bool> {
        (0..len).map(|i| qm.contains(&i)).collect()
    }

    fn assert_close(actual: Point3<f64>, expected: Point3<f64>) {
        assert!(
            (actual - expected).norm() < TOLERANCE,
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn mm_atom_across_the_boundary_is_shifted_next_to_the_qm_atom() {
        let topology = Topology::from_atoms(vec![
            TopologyAtom::new(8, 0.0).with_qm_group(0),
            TopologyAtom::new(11, 0.5),
        ]);
        let positions = vec![Point3::origin(), Point3::new(3.1, 0.0, 0.0)];
        let sim_box = SimulationBox::rectangular(3.0, 3.0, 3.0).unwrap();
        let charges = topology.charges_a();
        let frame = Frame::new(&positions, &sim_box, &charges, None);
        let neighbors = NeighborList::build(&topology, &positions, &sim_box, &[0], 1.0).unwrap();

        let mut layers = vec![QmLayer::new(&[0], &topology, settings()).unwrap()];
        let mut environment = MmEnvironment::new(0.8);
        EnvironmentUpdater::new()
            .update(
                CouplingScheme::Normal,
                &mut layers,
                &mut environment,
                &mask(2, &[0]),
                &frame,
                &neighbors,
                0,
            )
            .unwrap();

        assert_eq!(layers[0].shifts(), &[ShiftIndex::CENTRAL]);
        assert_eq!(environment.atom_indices(), &[1]);
        assert_eq!(environment.shifts(), &[shift(1, 0, 0)]);
        assert!((environment.scaled_charges()[0] - 0.4).abs() < TOLERANCE);
        assert_close(environment.shifted_coordinates()[0], Point3::new(0.1, 0.0, 0.0));
    }

    #[test]
    fn qm_atoms_never_enter_the_environment() {
        let topology = Topology::from_atoms(vec![
            TopologyAtom::new(8, 0.0).with_qm_group(0),
            TopologyAtom::new(1, 0.0).with_qm_group(0),
            TopologyAtom::new(11, 1.0),
        ]);
        let positions = vec![Point3::origin(), Point3::new(0.1, 0.0, 0.0), Point3::new(0.5, 0.0, 0.0)];
        let sim_box = SimulationBox::rectangular(3.0, 3.0, 3.0).unwrap();
        let charges = [0.3, -0.3, 1.0];
        let frame = Frame::new(&positions, &sim_box, &charges, None);

        let mut neighbors = NeighborList::new();
        neighbors.push_row(0, ShiftIndex::CENTRAL, vec![1, 2, 0]);
        neighbors.push_row(1, ShiftIndex::CENTRAL, vec![0, 2]);

        let mut layers = vec![QmLayer::new(&[0, 1], &topology, settings()).unwrap()];
        let mut environment = MmEnvironment::new(1.0);
        EnvironmentUpdater::new()
            .update(
                CouplingScheme::Normal,
                &mut layers,
                &mut environment,
                &mask(3, &[0, 1]),
                &frame,
                &neighbors,
                3,
            )
            .unwrap();

        assert_eq!(environment.atom_indices(), &[2]);
    }

    #[test]
    fn uncharged_candidates_are_dropped_unless_the_b_state_is_charged() {
        let topology = Topology::from_atoms(vec![
            TopologyAtom::new(8, 0.0).with_qm_group(0),
            TopologyAtom::new(1, 0.0),
            TopologyAtom::new(1, 0.0),
            TopologyAtom::new(1, 0.2),
        ]);
        let positions = vec![Point3::origin(); 4];
        let sim_box = SimulationBox::rectangular(3.0, 3.0, 3.0).unwrap();
        let charges_a = [0.0, 0.0, 0.0, 0.2];
        let charges_b = [0.0, 0.0, 0.5, 0.2];

        let mut neighbors = NeighborList::new();
        neighbors.push_row(0, ShiftIndex::CENTRAL, vec![1, 2, 3]);
        let qm_mask = mask(4, &[0]);
        let mut updater = EnvironmentUpdater::new();
        let mut layers = vec![QmLayer::new(&[0], &topology, settings()).unwrap()];
        let mut environment = MmEnvironment::new(1.0);

        let frame = Frame::new(&positions, &sim_box, &charges_a, None);
        updater
            .update(CouplingScheme::Normal, &mut layers, &mut environment, &qm_mask, &frame, &neighbors, 0)
            .unwrap();
        assert_eq!(environment.atom_indices(), &[3]);

        let frame = Frame::new(&positions, &sim_box, &charges_a, Some(&charges_b));
        updater
            .update(CouplingScheme::Normal, &mut layers, &mut environment, &qm_mask, &frame, &neighbors, 1)
            .unwrap();
        assert_eq!(environment.atom_indices(), &[2, 3]);
        assert_eq!(environment.scaled_charges(), &[0.0, 0.2]);
    }

    #[test]
    fn first_encountered_shift_wins_for_repeated_candidates() {
        let mut candidates = vec![
            Candidate::new(5, shift(1, 0, 0)),
            Candidate::new(2, ShiftIndex::CENTRAL),
            Candidate::new(5, shift(-1, 0, 0)),
            Candidate::new(2, shift(0, 1, 0)),
        ];
        dedup_candidates(&mut candidates);
        assert_eq!(
            candidates,
            vec![
                Candidate::new(2, ShiftIndex::CENTRAL),
                Candidate::new(5, shift(1, 0, 0)),
            ]
        );
    }

    #[test]
    fn reducing_candidates_twice_matches_reducing_once() {
        let positions = vec![Point3::origin(); 6];
        let sim_box = SimulationBox::rectangular(2.0, 2.0, 2.0).unwrap();
        let charges = [0.0, 0.4, 0.0, -0.4, 0.1, 0.0];
        let frame = Frame::new(&positions, &sim_box, &charges, None);
        let qm_mask = mask(6, &[4]);

        let mut candidates = vec![
            Candidate::new(3, shift(0, 0, 1)),
            Candidate::new(1, ShiftIndex::CENTRAL),
            Candidate::new(4, ShiftIndex::CENTRAL),
            Candidate::new(2, ShiftIndex::CENTRAL),
            Candidate::new(3, ShiftIndex::CENTRAL),
            Candidate::new(1, shift(2, 0, 0)),
        ];
        reduce_mm_candidates(&mut candidates, &qm_mask, &frame);
        let once = candidates.clone();
        reduce_mm_candidates(&mut candidates, &qm_mask, &frame);

        assert_eq!(candidates, once);
        assert_eq!(
            once,
            vec![
                Candidate::new(1, ShiftIndex::CENTRAL),
                Candidate::new(3, shift(0, 0, 1)),
            ]
        );
    }

    #[test]
    fn second_i_particle_is_shifted_next_to_the_reference() {
        let topology = Topology::from_atoms(vec![
            TopologyAtom::new(6, 0.0).with_qm_group(0),
            TopologyAtom::new(6, 0.0).with_qm_group(0),
            TopologyAtom::new(8, -0.5),
        ]);
        let positions = vec![
            Point3::new(0.1, 1.0, 1.0),
            Point3::new(2.9, 1.0, 1.0),
            Point3::new(2.5, 1.0, 1.0),
        ];
        let sim_box = SimulationBox::rectangular(3.0, 3.0, 3.0).unwrap();
        let charges = topology.charges_a();
        let frame = Frame::new(&positions, &sim_box, &charges, None);

        let mut neighbors = NeighborList::new();
        neighbors.push_row(0, ShiftIndex::CENTRAL, vec![]);
        neighbors.push_row(1, ShiftIndex::CENTRAL, vec![2]);

        let mut layers = vec![QmLayer::new(&[0, 1], &topology, settings()).unwrap()];
        let mut environment = MmEnvironment::new(1.0);
        EnvironmentUpdater::new()
            .update(
                CouplingScheme::Normal,
                &mut layers,
                &mut environment,
                &mask(3, &[0, 1]),
                &frame,
                &neighbors,
                0,
            )
            .unwrap();

        assert_eq!(layers[0].shifts(), &[ShiftIndex::CENTRAL, shift(1, 0, 0)]);
        assert_close(layers[0].shifted_coordinates()[1], Point3::new(-0.1, 1.0, 1.0));
        assert_eq!(environment.shifts(), &[shift(1, 0, 0)]);
        assert_close(environment.shifted_coordinates()[0], Point3::new(-0.5, 1.0, 1.0));
    }

    #[test]
    fn charge_group_members_inherit_the_representative_shift() {
        let topology = Topology::from_atoms(vec![
            TopologyAtom::new(11, 1.0),
            TopologyAtom::new(6, 0.0).with_qm_group(0).with_charge_group(7),
            TopologyAtom::new(1, 0.0).with_qm_group(0).with_charge_group(7),
            TopologyAtom::new(8, 0.0).with_qm_group(0),
        ]);
        let positions = vec![
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(0.2, 0.2, 0.2),
            Point3::new(0.3, 0.2, 0.2),
            Point3::new(2.9, 0.2, 0.2),
        ];
        let sim_box = SimulationBox::rectangular(3.0, 3.0, 3.0).unwrap();
        let charges = topology.charges_a();
        let frame = Frame::new(&positions, &sim_box, &charges, None);

        let mut neighbors = NeighborList::new();
        neighbors.push_row(3, ShiftIndex::CENTRAL, vec![0]);
        neighbors.push_row(1, ShiftIndex::CENTRAL, vec![0]);

        let mut layers = vec![QmLayer::new(&[1, 2, 3], &topology, settings()).unwrap()];
        let mut environment = MmEnvironment::new(1.0);
        EnvironmentUpdater::new()
            .update(
                CouplingScheme::Normal,
                &mut layers,
                &mut environment,
                &mask(4, &[1, 2, 3]),
                &frame,
                &neighbors,
                0,
            )
            .unwrap();

        let representative = shift(-1, 0, 0);
        assert_eq!(
            layers[0].shifts(),
            &[representative, representative, ShiftIndex::CENTRAL]
        );
        assert_eq!(environment.atom_indices(), &[0]);
        assert_eq!(environment.shifts(), &[ShiftIndex::CENTRAL]);
    }

    #[test]
    fn carrying_a_shift_across_charge_groups_is_inconsistent() {
        let topology = Topology::from_atoms(vec![
            TopologyAtom::new(6, 0.0).with_qm_group(0),
            TopologyAtom::new(6, 0.0).with_qm_group(0),
        ]);
        let positions = vec![Point3::origin(); 2];
        let sim_box = SimulationBox::rectangular(3.0, 3.0, 3.0).unwrap();
        let charges = [0.0, 0.0];
        let frame = Frame::new(&positions, &sim_box, &charges, None);

        let mut neighbors = NeighborList::new();
        neighbors.push_row(0, ShiftIndex::CENTRAL, vec![]);

        let mut layers = vec![QmLayer::new(&[0, 1], &topology, settings()).unwrap()];
        let result = EnvironmentUpdater::new().update(
            CouplingScheme::Normal,
            &mut layers,
            &mut MmEnvironment::new(1.0),
            &mask(2, &[0, 1]),
            &frame,
            &neighbors,
            12,
        );

        assert!(matches!(
            result,
            Err(QmmmError::InconsistentState { step: 12, .. })
        ));
    }

    #[test]
    fn missing_or_foreign_i_particles_are_inconsistent() {
        let topology = Topology::from_atoms(vec![
            TopologyAtom::new(6, 0.0).with_qm_group(0),
            TopologyAtom::new(8, -0.5),
        ]);
        let positions = vec![Point3::origin(); 2];
        let sim_box = SimulationBox::rectangular(3.0, 3.0, 3.0).unwrap();
        let charges = topology.charges_a();
        let frame = Frame::new(&positions, &sim_box, &charges, None);
        let qm_mask = mask(2, &[0]);
        let mut layers = vec![QmLayer::new(&[0], &topology, settings()).unwrap()];
        let mut environment = MmEnvironment::new(1.0);
        let mut updater = EnvironmentUpdater::new();

        let empty = NeighborList::new();
        let result = updater.update(CouplingScheme::Normal, &mut layers, &mut environment, &qm_mask, &frame, &empty, 1);
        assert!(matches!(result, Err(QmmmError::InconsistentState { .. })));

        let mut foreign = NeighborList::new();
        foreign.push_row(1, ShiftIndex::CENTRAL, vec![0]);
        let result = updater.update(CouplingScheme::Normal, &mut layers, &mut environment, &qm_mask, &frame, &foreign, 2);
        assert!(matches!(result, Err(QmmmError::InconsistentState { .. })));
    }

    #[test]
    fn out_of_range_j_particle_is_inconsistent() {
        let topology = Topology::from_atoms(vec![
            TopologyAtom::new(6, 0.0).with_qm_group(0),
            TopologyAtom::new(8, -0.5),
        ]);
        let positions = vec![Point3::origin(), Point3::new(0.5, 0.0, 0.0)];
        let sim_box = SimulationBox::rectangular(3.0, 3.0, 3.0).unwrap();
        let charges = topology.charges_a();
        let frame = Frame::new(&positions, &sim_box, &charges, None);

        let mut neighbors = NeighborList::new();
        neighbors.push_row(0, ShiftIndex::CENTRAL, vec![1, 99]);

        let mut layers = vec![QmLayer::new(&[0], &topology, settings()).unwrap()];
        let mut environment = MmEnvironment::new(1.0);
        let result = EnvironmentUpdater::new().update(
            CouplingScheme::Normal,
            &mut layers,
            &mut environment,
            &mask(2, &[0]),
            &frame,
            &neighbors,
            5,
        );

        match result {
            Err(QmmmError::InconsistentState { step, message }) => {
                assert_eq!(step, 5);
                assert!(message.contains("99"));
            }
            other => panic!("expected an inconsistent state, got {other:?}"),
        }
    }

    #[test]
    fn split_charge_group_with_two_shifts_is_inconsistent() {
        let topology = Topology::from_atoms(vec![
            TopologyAtom::new(6, 0.0).with_qm_group(0).with_charge_group(7),
            TopologyAtom::new(1, 0.0).with_qm_group(0).with_charge_group(7),
        ]);
        let positions = vec![Point3::new(0.1, 1.0, 1.0), Point3::new(2.9, 1.0, 1.0)];
        let sim_box = SimulationBox::rectangular(3.0, 3.0, 3.0).unwrap();
        let charges = topology.charges_a();
        let frame = Frame::new(&positions, &sim_box, &charges, None);

        let mut neighbors = NeighborList::new();
        neighbors.push_row(0, ShiftIndex::CENTRAL, vec![]);
        neighbors.push_row(1, ShiftIndex::CENTRAL, vec![]);

        let mut layers = vec![QmLayer::new(&[0, 1], &topology, settings()).unwrap()];
        let result = EnvironmentUpdater::new().update(
            CouplingScheme::Normal,
            &mut layers,
            &mut MmEnvironment::new(1.0),
            &mask(2, &[0, 1]),
            &frame,
            &neighbors,
            8,
        );

        assert!(matches!(
            result,
            Err(QmmmError::InconsistentState { step: 8, .. })
        ));
    }

    #[test]
    fn oniom_layers_are_shifted_around_their_first_atom_and_have_no_environment() {
        let topology = Topology::from_atoms(vec![
            TopologyAtom::new(6, 0.1).with_qm_group(0),
            TopologyAtom::new(6, 0.1).with_qm_group(0),
            TopologyAtom::new(1, 0.1).with_qm_group(1),
            TopologyAtom::new(8, -0.8),
        ]);
        let positions = vec![
            Point3::new(2.9, 1.0, 1.0),
            Point3::new(0.1, 1.0, 1.0),
            Point3::new(1.5, 2.9, 1.0),
            Point3::new(1.5, 1.5, 1.5),
        ];
        let sim_box = SimulationBox::rectangular(3.0, 3.0, 3.0).unwrap();
        let charges = topology.charges_a();
        let frame = Frame::new(&positions, &sim_box, &charges, None);

        let mut layers = vec![
            QmLayer::new(&[0, 1], &topology, settings()).unwrap(),
            QmLayer::new(&[0, 1, 2], &topology, settings()).unwrap(),
        ];
        let mut environment = MmEnvironment::new(1.0);
        let mut neighbors = NeighborList::new();
        neighbors.push_row(0, ShiftIndex::CENTRAL, vec![3]);

        EnvironmentUpdater::new()
            .update(
                CouplingScheme::Oniom,
                &mut layers,
                &mut environment,
                &mask(4, &[0, 1, 2]),
                &frame,
                &neighbors,
                0,
            )
            .unwrap();

        assert!(environment.is_empty());
        assert_eq!(layers[0].shifts(), &[ShiftIndex::CENTRAL, shift(-1, 0, 0)]);
        assert_close(layers[0].shifted_coordinates()[1], Point3::new(3.1, 1.0, 1.0));
        assert_eq!(
            layers[1].shifts(),
            &[ShiftIndex::CENTRAL, shift(-1, 0, 0), shift(0, 1, 0)]
        );
    }

    #[test]
    fn shifts_are_unchanged_by_translating_the_system_one_box_length() {
        let topology = Topology::from_atoms(vec![
            TopologyAtom::new(8, 0.0).with_qm_group(0),
            TopologyAtom::new(1, 0.0).with_qm_group(0),
            TopologyAtom::new(11, 1.0),
            TopologyAtom::new(17, -1.0),
        ]);
        let positions = vec![
            Point3::new(0.2, 1.0, 1.0),
            Point3::new(2.8, 1.1, 1.0),
            Point3::new(2.4, 0.9, 1.2),
            Point3::new(0.6, 1.4, 0.7),
        ];
        let sim_box = SimulationBox::rectangular(3.0, 3.0, 3.0).unwrap();
        let period = sim_box.vectors()[0];
        let translated: Vec<Point3<f64>> = positions.iter().map(|p| p + period).collect();
        let charges = topology.charges_a();
        let qm_mask = mask(4, &[0, 1]);

        let run = |positions: &[Point3<f64>]| {
            let frame = Frame::new(positions, &sim_box, &charges, None);
            let neighbors =
                NeighborList::build(&topology, positions, &sim_box, &[0, 1], 1.2).unwrap();
            let mut layers = vec![QmLayer::new(&[0, 1], &topology, settings()).unwrap()];
            let mut environment = MmEnvironment::new(1.0);
            EnvironmentUpdater::new()
                .update(
                    CouplingScheme::Normal,
                    &mut layers,
                    &mut environment,
                    &qm_mask,
                    &frame,
                    &neighbors,
                    0,
                )
                .unwrap();
            (layers.remove(0), environment)
        };

        let (layer, environment) = run(positions.as_slice());
        let (moved_layer, moved_environment) = run(translated.as_slice());

        assert_eq!(layer.shifts(), moved_layer.shifts());
        assert_eq!(environment.atom_indices(), moved_environment.atom_indices());
        assert_eq!(environment.shifts(), moved_environment.shifts());
        assert!(!environment.is_empty());
        for (a, b) in layer
            .shifted_coordinates()
            .iter()
            .zip(moved_layer.shifted_coordinates())
            .chain(
                environment
                    .shifted_coordinates()
                    .iter()
                    .zip(moved_environment.shifted_coordinates()),
            )
        {
            assert_close(*a + period, *b);
        }
    }
}
