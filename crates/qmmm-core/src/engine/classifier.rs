use super::config::{ConfigError, CouplingConfig, CouplingScheme, CutoffScheme, RunParameters};
use crate::core::models::layer::{LayerSettings, QmLayer};
use crate::core::models::topology::Topology;
use itertools::Itertools;
use tracing::{info, instrument};

/// The result of partitioning the topology into QM and MM atoms.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Atoms of each configured QM group, ascending and mutually disjoint.
    pub groups: Vec<Vec<usize>>,
    /// QM layers ordered from the innermost to the outermost.
    pub layers: Vec<QmLayer>,
    /// `true` for every atom that is treated quantum-mechanically.
    pub qm_mask: Vec<bool>,
}

impl Classification {
    pub fn qm_atom_count(&self) -> usize {
        self.qm_mask.iter().filter(|&&is_qm| is_qm).count()
    }
}

/// Decides, once at setup, which atoms are QM and how they form layers.
pub struct AtomClassifier<'a> {
    config: &'a CouplingConfig,
}

impl<'a> AtomClassifier<'a> {
    pub fn new(config: &'a CouplingConfig) -> Self {
        Self { config }
    }

    /// Rejects runs the coupling engine cannot take part in.
    pub fn validate_run(run: &RunParameters) -> Result<(), ConfigError> {
        if run.ranks != 1 {
            return Err(ConfigError::UnsupportedRankCount { ranks: run.ranks });
        }
        if run.cutoff_scheme != CutoffScheme::Group {
            return Err(ConfigError::UnsupportedCutoffScheme(run.cutoff_scheme));
        }
        if !run.integrator.is_dynamics() {
            return Err(ConfigError::NonDynamicsIntegrator(run.integrator));
        }
        Ok(())
    }

    /// Collects the atoms of every configured group in ascending index order.
    ///
    /// In the ONIOM scheme a two-atom virtual site whose constructing atoms lie in its
    /// own group is a link atom and is left out of that group.
    pub fn group_atoms(&self, topology: &Topology) -> Result<Vec<Vec<usize>>, ConfigError> {
        let configured = self.config.groups.len();
        let mut groups = vec![Vec::new(); configured];

        for (atom, group) in topology
            .atoms()
            .iter()
            .enumerate()
            .filter_map(|(index, atom)| atom.qm_group.map(|group| (index, group)))
        {
            let members = groups.get_mut(group).ok_or(ConfigError::UnconfiguredGroup {
                atom,
                group,
                configured,
            })?;
            members.push(atom);
        }

        if self.config.scheme == CouplingScheme::Oniom {
            for site in topology.virtual_sites() {
                let Some(group) = topology.qm_group(site.site) else {
                    continue;
                };
                let linker = site
                    .constructing
                    .iter()
                    .all(|&atom| topology.qm_group(atom) == Some(group));
                if linker {
                    groups[group].retain(|&atom| atom != site.site);
                }
            }
        }

        for (group, members) in groups.iter().enumerate() {
            if members.is_empty() {
                return Err(ConfigError::NoQmAtoms { group });
            }
        }
        Ok(groups)
    }

    /// Forms the QM layers from disjoint group memberships.
    ///
    /// The Normal scheme merges every group into one layer configured by group 0. In the
    /// ONIOM scheme layer `i` holds groups `0..=i`, so each layer encloses the previous
    /// one, and is configured by group `i`.
    pub fn build_layers(
        &self,
        groups: &[Vec<usize>],
        topology: &Topology,
    ) -> Result<Vec<QmLayer>, ConfigError> {
        match self.config.scheme {
            CouplingScheme::Normal => {
                let atoms: Vec<usize> = groups.iter().flatten().copied().sorted().collect();
                let settings = self
                    .config
                    .groups
                    .first()
                    .map(LayerSettings::from)
                    .ok_or(ConfigError::NoQmGroups)?;
                Ok(vec![QmLayer::new(&atoms, topology, settings)?])
            }
            CouplingScheme::Oniom => self
                .config
                .groups
                .iter()
                .enumerate()
                .map(|(layer, group_config)| {
                    let atoms: Vec<usize> = groups
                        .iter()
                        .take(layer + 1)
                        .flatten()
                        .copied()
                        .sorted()
                        .collect();
                    QmLayer::new(&atoms, topology, LayerSettings::from(group_config))
                        .map_err(ConfigError::from)
                })
                .collect(),
        }
    }

    /// Validates the run, forms the layers and, in the Normal scheme, zeroes the
    /// classical charges of all QM atoms in `topology`.
    #[instrument(skip_all, name = "atom_classification")]
    pub fn classify(
        &self,
        topology: &mut Topology,
        run: &RunParameters,
    ) -> Result<Classification, ConfigError> {
        Self::validate_run(run)?;

        let groups = self.group_atoms(topology)?;
        let layers = self.build_layers(&groups, topology)?;

        let mut qm_mask = vec![false; topology.len()];
        for &atom in groups.iter().flatten() {
            qm_mask[atom] = true;
        }

        if self.config.scheme == CouplingScheme::Normal {
            let qm_atoms: Vec<usize> = groups.iter().flatten().copied().collect();
            topology.zero_charges(&qm_atoms)?;
        }

        for (index, layer) in layers.iter().enumerate() {
            info!(
                layer = index,
                atoms = layer.len(),
                electrons = layer.electron_count(),
                charge = layer.net_charge(),
                multiplicity = layer.multiplicity(),
                level = %layer.level(),
                "QM layer initialized."
            );
        }

        let classification = Classification {
            groups,
            layers,
            qm_mask,
        };
        info!(
            scheme = %self.config.scheme,
            qm_atoms = classification.qm_atom_count(),
            mm_atoms = topology.len() - classification.qm_atom_count(),
            "Atom classification complete."
        );
        Ok(classification)
    }
}
