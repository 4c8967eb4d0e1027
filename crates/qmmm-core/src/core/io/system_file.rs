use crate::core::models::atom::TopologyAtom;
use crate::core::models::topology::{Topology, TopologyError, VirtualSite2};
use crate::core::pbc::PbcError;
use crate::core::pbc::cell::SimulationBox;
use nalgebra::{Point3, Vector3};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct BoxRecord {
    vectors: [[f64; 3]; 3],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct AtomRecord {
    atomic_number: u8,
    charge: f64,
    charge_b: Option<f64>,
    qm_group: Option<usize>,
    charge_group: Option<usize>,
    position: [f64; 3],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct VirtualSiteRecord {
    site: usize,
    constructing: [usize; 2],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct SystemRecord {
    #[serde(rename = "box")]
    sim_box: BoxRecord,
    #[serde(default)]
    atoms: Vec<AtomRecord>,
    #[serde(default)]
    virtual_sites: Vec<VirtualSiteRecord>,
}

#[derive(Debug, Error)]
pub enum SystemLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid simulation box: {0}")]
    InvalidBox(#[from] PbcError),
    #[error("Invalid virtual site: {0}")]
    InvalidVirtualSite(#[from] TopologyError),
    #[error("Atom {index} has a non-finite position")]
    NonFinitePosition { index: usize },
}

/// A complete system as the classical engine would see it at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemSnapshot {
    pub topology: Topology,
    pub positions: Vec<Point3<f64>>,
    pub sim_box: SimulationBox,
}

impl SystemSnapshot {
    pub fn load(path: &Path) -> Result<Self, SystemLoadError> {
        let display = path.to_string_lossy().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| SystemLoadError::Io {
            path: display.clone(),
            source: e,
        })?;
        Self::parse(&content, &display)
    }

    /// Parses a snapshot from TOML text; `origin` names the source in error messages.
    pub fn parse(content: &str, origin: &str) -> Result<Self, SystemLoadError> {
        let record: SystemRecord = toml::from_str(content).map_err(|e| SystemLoadError::Toml {
            path: origin.to_string(),
            source: e,
        })?;

        let [a, b, c] = record.sim_box.vectors.map(Vector3::<f64>::from);
        let sim_box = SimulationBox::triclinic(a, b, c)?;

        let mut topology = Topology::new();
        let mut positions = Vec::with_capacity(record.atoms.len());
        for (index, atom) in record.atoms.into_iter().enumerate() {
            if !atom.position.iter().all(|x| x.is_finite()) {
                return Err(SystemLoadError::NonFinitePosition { index });
            }
            let mut topology_atom = TopologyAtom::new(atom.atomic_number, atom.charge);
            topology_atom.charge_b = atom.charge_b;
            topology_atom.qm_group = atom.qm_group;
            topology_atom.charge_group = atom.charge_group;
            topology.add_atom(topology_atom);
            positions.push(Point3::from(atom.position));
        }
        for site in record.virtual_sites {
            topology.add_virtual_site(VirtualSite2 {
                site: site.site,
                constructing: site.constructing,
            })?;
        }

        Ok(Self {
            topology,
            positions,
            sim_box,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::ChargeGroup;
    use std::fs;
    use tempfile::tempdir;

    const WATER_IN_BOX: &str = r#"
        [box]
        vectors = [[3.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 3.0]]

        [[atoms]]
        atomic-number = 8
        charge = -0.834
        qm-group = 0
        charge-group = 0
        position = [0.0, 0.0, 0.0]

        [[atoms]]
        atomic-number = 1
        charge = 0.417
        charge-b = 0.0
        charge-group = 0
        position = [0.1, 0.0, 0.0]

        [[atoms]]
        atomic-number = 1
        charge = 0.417
        position = [3.1, 0.0, 0.0]

        [[virtual-sites]]
        site = 2
        constructing = [0, 1]
    "#;

    #[test]
    fn load_succeeds_with_valid_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("system.toml");
        fs::write(&path, WATER_IN_BOX).unwrap();

        let snapshot = SystemSnapshot::load(&path).unwrap();

        assert_eq!(snapshot.topology.len(), 3);
        assert_eq!(snapshot.positions[2], Point3::new(3.1, 0.0, 0.0));
        assert_eq!(snapshot.topology.qm_group(0), Some(0));
        assert_eq!(snapshot.topology.atom(1).unwrap().charge_b, Some(0.0));
        assert_eq!(snapshot.topology.charge_group(1), ChargeGroup::Shared(0));
        assert_eq!(snapshot.topology.charge_group(2), ChargeGroup::Single(2));
        assert_eq!(snapshot.topology.virtual_sites().len(), 1);
        assert!(snapshot.sim_box.is_rectangular());
    }

    #[test]
    fn load_fails_for_missing_file() {
        let dir = tempdir().unwrap();
        let result = SystemSnapshot::load(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(SystemLoadError::Io { .. })));
    }

    #[test]
    fn parse_fails_for_malformed_toml() {
        let result = SystemSnapshot::parse("this is not toml", "inline");
        assert!(matches!(result, Err(SystemLoadError::Toml { .. })));
    }

    #[test]
    fn parse_rejects_unknown_keys() {
        let content = WATER_IN_BOX.replace("charge-group = 0\n        position", "colour = 1\n        position");
        let result = SystemSnapshot::parse(&content, "inline");
        assert!(matches!(result, Err(SystemLoadError::Toml { .. })));
    }

    #[test]
    fn parse_fails_for_degenerate_box() {
        let content = WATER_IN_BOX.replace("[0.0, 3.0, 0.0]", "[0.0, 0.0, 0.0]");
        let result = SystemSnapshot::parse(&content, "inline");
        assert!(matches!(result, Err(SystemLoadError::InvalidBox(_))));
    }

    #[test]
    fn parse_fails_for_dangling_virtual_site() {
        let content = WATER_IN_BOX.replace("constructing = [0, 1]", "constructing = [0, 9]");
        let result = SystemSnapshot::parse(&content, "inline");
        assert!(matches!(result, Err(SystemLoadError::InvalidVirtualSite(_))));
    }
}
