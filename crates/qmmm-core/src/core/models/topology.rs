use super::atom::{ChargeGroup, TopologyAtom};
use thiserror::Error;

/// A virtual site constructed from two real atoms.
///
/// In multi-layer setups these sites act as link atoms bridging a layer boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualSite2 {
    pub site: usize,
    pub constructing: [usize; 2],
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("Atom index {index} is out of range for a topology of {atom_count} atoms")]
    AtomOutOfRange { index: usize, atom_count: usize },
}

/// The static description of every atom in the simulated system.
///
/// Atoms are addressed by their global index, which is also the index used by the
/// classical engine for positions, charges and forces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    atoms: Vec<TopologyAtom>,
    virtual_sites: Vec<VirtualSite2>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_atoms(atoms: Vec<TopologyAtom>) -> Self {
        Self {
            atoms,
            virtual_sites: Vec::new(),
        }
    }

    /// Appends an atom and returns its global index.
    pub fn add_atom(&mut self, atom: TopologyAtom) -> usize {
        self.atoms.push(atom);
        self.atoms.len() - 1
    }

    /// Registers a two-atom virtual site.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::AtomOutOfRange`] if any of the three atoms is unknown.
    pub fn add_virtual_site(&mut self, site: VirtualSite2) -> Result<(), TopologyError> {
        for index in [site.site, site.constructing[0], site.constructing[1]] {
            self.check_index(index)?;
        }
        self.virtual_sites.push(site);
        Ok(())
    }

    pub fn atoms(&self) -> &[TopologyAtom] {
        &self.atoms
    }

    pub fn atom(&self, index: usize) -> Option<&TopologyAtom> {
        self.atoms.get(index)
    }

    pub fn virtual_sites(&self) -> &[VirtualSite2] {
        &self.virtual_sites
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn qm_group(&self, index: usize) -> Option<usize> {
        self.atoms.get(index).and_then(|atom| atom.qm_group)
    }

    pub fn charge_group(&self, index: usize) -> ChargeGroup {
        match self.atoms.get(index).and_then(|atom| atom.charge_group) {
            Some(group) => ChargeGroup::Shared(group),
            None => ChargeGroup::Single(index),
        }
    }

    /// Charges of the A state, indexed by global atom index.
    pub fn charges_a(&self) -> Vec<f64> {
        self.atoms.iter().map(|atom| atom.charge).collect()
    }

    /// Charges of the B state, or `None` when no atom carries a B-state charge.
    ///
    /// Atoms without an explicit B-state charge report their A-state charge.
    pub fn charges_b(&self) -> Option<Vec<f64>> {
        if self.atoms.iter().all(|atom| atom.charge_b.is_none()) {
            return None;
        }
        Some(
            self.atoms
                .iter()
                .map(|atom| atom.charge_b.unwrap_or(atom.charge))
                .collect(),
        )
    }

    /// Zeroes both charge states of the given atoms.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::AtomOutOfRange`] before touching any atom if an index
    /// is unknown.
    pub fn zero_charges(&mut self, indices: &[usize]) -> Result<(), TopologyError> {
        for &index in indices {
            self.check_index(index)?;
        }
        for &index in indices {
            let atom = &mut self.atoms[index];
            atom.charge = 0.0;
            if atom.charge_b.is_some() {
                atom.charge_b = Some(0.0);
            }
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<(), TopologyError> {
        if index < self.atoms.len() {
            Ok(())
        } else {
            Err(TopologyError::AtomOutOfRange {
                index,
                atom_count: self.atoms.len(),
            })
        }
    }
}
