/// Charge-group membership of an atom.
///
/// Atoms in the same charge group are treated as one unit by the classical neighbor
/// search and share the periodic shift of the group's representative atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChargeGroup {
    /// An explicitly declared group shared by several atoms.
    Shared(usize),
    /// The atom forms a group on its own; the payload is the atom's global index.
    Single(usize),
}

/// An atom as described by the system topology.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyAtom {
    /// Nuclear charge, used to count electrons in a QM layer.
    pub atomic_number: u8,
    /// Classical partial charge of the A state (e).
    pub charge: f64,
    /// Classical partial charge of the B state when free-energy perturbation is active.
    pub charge_b: Option<f64>,
    /// The QM group this atom belongs to, if any.
    pub qm_group: Option<usize>,
    /// Explicit charge-group id; atoms without one form their own group.
    pub charge_group: Option<usize>,
}

impl TopologyAtom {
    pub fn new(atomic_number: u8, charge: f64) -> Self {
        Self {
            atomic_number,
            charge,
            charge_b: None,
            qm_group: None,
            charge_group: None,
        }
    }

    pub fn with_charge_b(mut self, charge_b: f64) -> Self {
        self.charge_b = Some(charge_b);
        self
    }

    pub fn with_qm_group(mut self, group: usize) -> Self {
        self.qm_group = Some(group);
        self
    }

    pub fn with_charge_group(mut self, group: usize) -> Self {
        self.charge_group = Some(group);
        self
    }

    /// Whether both charge states are exactly zero.
    pub fn is_uncharged(&self) -> bool {
        self.charge == 0.0 && self.charge_b.is_none_or(|q| q == 0.0)
    }
}
