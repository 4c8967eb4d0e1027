use crate::core::pbc::cell::SimulationBox;
use nalgebra::Point3;

/// The per-step data the classical engine hands to the coupling engine.
///
/// Positions and charges are indexed by global atom index. `charges_b` is present only
/// when free-energy perturbation is active.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub positions: &'a [Point3<f64>],
    pub sim_box: &'a SimulationBox,
    pub charges_a: &'a [f64],
    pub charges_b: Option<&'a [f64]>,
}

impl<'a> Frame<'a> {
    pub fn new(
        positions: &'a [Point3<f64>],
        sim_box: &'a SimulationBox,
        charges_a: &'a [f64],
        charges_b: Option<&'a [f64]>,
    ) -> Self {
        Self {
            positions,
            sim_box,
            charges_a,
            charges_b,
        }
    }

    pub fn atom_count(&self) -> usize {
        self.positions.len()
    }

    /// Whether an atom carries no classical charge in either state.
    ///
    /// Atoms outside the charge tables are reported as uncharged.
    pub fn is_uncharged(&self, index: usize) -> bool {
        let a_zero = self.charges_a.get(index).is_none_or(|&q| q == 0.0);
        let b_zero = self
            .charges_b
            .is_none_or(|charges| charges.get(index).is_none_or(|&q| q == 0.0));
        a_zero && b_zero
    }
}
