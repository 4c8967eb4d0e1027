use crate::core::models::layer::{LayerError, LayerSettings, SurfaceHopping};
use crate::core::models::topology::TopologyError;
use crate::core::qm::backend::BackendError;
use crate::core::qm::method::{LevelOfTheory, QmBasis, QmMethod, UnknownNameError};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("QM/MM must run on exactly one rank, got {ranks}")]
    UnsupportedRankCount { ranks: usize },

    #[error("QM/MM requires the group cutoff scheme, got '{0}'")]
    UnsupportedCutoffScheme(CutoffScheme),

    #[error("QM/MM requires a dynamics integrator, got '{0}'")]
    NonDynamicsIntegrator(Integrator),

    #[error("No QM groups are configured")]
    NoQmGroups,

    #[error("Atom {atom} belongs to QM group {group}, but only {configured} groups are configured")]
    UnconfiguredGroup {
        atom: usize,
        group: usize,
        configured: usize,
    },

    #[error("QM group {group} contains no atoms")]
    NoQmAtoms { group: usize },

    #[error("Spin multiplicity must be at least 1, got {0}")]
    InvalidMultiplicity(u32),

    #[error("Electrostatic scale factor must be finite, got {0}")]
    InvalidScaleFactor(f64),

    #[error("Invalid QM layer: {0}")]
    Layer(#[from] LayerError),

    #[error("Invalid topology: {0}")]
    Topology(#[from] TopologyError),

    #[error("Unsupported QM backend combination: {0}")]
    Backend(#[from] BackendError),
}

/// How QM and MM regions interact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CouplingScheme {
    /// One QM region embedded in the MM point charges.
    Normal,
    /// Nested QM layers combined by ONIOM extrapolation.
    Oniom,
}

/// The classical engine's neighbor-search scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CutoffScheme {
    Group,
    Verlet,
}

/// The integrator driving the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Integrator {
    Md,
    MdVv,
    MdVvAvek,
    Sd,
    Bd,
    Steep,
    Cg,
    Lbfgs,
    NormalModes,
}

impl CouplingScheme {
    pub fn name(self) -> &'static str {
        match self {
            CouplingScheme::Normal => "normal",
            CouplingScheme::Oniom => "oniom",
        }
    }
}

impl CutoffScheme {
    pub fn name(self) -> &'static str {
        match self {
            CutoffScheme::Group => "group",
            CutoffScheme::Verlet => "verlet",
        }
    }
}

impl Integrator {
    pub fn name(self) -> &'static str {
        match self {
            Integrator::Md => "md",
            Integrator::MdVv => "md-vv",
            Integrator::MdVvAvek => "md-vv-avek",
            Integrator::Sd => "sd",
            Integrator::Bd => "bd",
            Integrator::Steep => "steep",
            Integrator::Cg => "cg",
            Integrator::Lbfgs => "l-bfgs",
            Integrator::NormalModes => "nm",
        }
    }

    pub fn is_dynamics(self) -> bool {
        matches!(
            self,
            Integrator::Md | Integrator::MdVv | Integrator::MdVvAvek | Integrator::Sd | Integrator::Bd
        )
    }
}

impl fmt::Display for CouplingScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for CutoffScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Integrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn unknown(kind: &'static str, name: &str) -> UnknownNameError {
    UnknownNameError {
        kind,
        name: name.to_string(),
    }
}

impl FromStr for CouplingScheme {
    type Err = UnknownNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(CouplingScheme::Normal),
            "oniom" => Ok(CouplingScheme::Oniom),
            _ => Err(unknown("coupling scheme", s)),
        }
    }
}

impl FromStr for CutoffScheme {
    type Err = UnknownNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "group" => Ok(CutoffScheme::Group),
            "verlet" => Ok(CutoffScheme::Verlet),
            _ => Err(unknown("cutoff scheme", s)),
        }
    }
}

impl FromStr for Integrator {
    type Err = UnknownNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md" => Ok(Integrator::Md),
            "md-vv" => Ok(Integrator::MdVv),
            "md-vv-avek" => Ok(Integrator::MdVvAvek),
            "sd" => Ok(Integrator::Sd),
            "bd" => Ok(Integrator::Bd),
            "steep" => Ok(Integrator::Steep),
            "cg" => Ok(Integrator::Cg),
            "l-bfgs" | "lbfgs" => Ok(Integrator::Lbfgs),
            "nm" => Ok(Integrator::NormalModes),
            _ => Err(unknown("integrator", s)),
        }
    }
}

/// Run-level facts the coupling engine must validate before the first step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunParameters {
    pub ranks: usize,
    pub cutoff_scheme: CutoffScheme,
    pub integrator: Integrator,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            ranks: 1,
            cutoff_scheme: CutoffScheme::Group,
            integrator: Integrator::Md,
        }
    }
}

/// User configuration of one QM group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QmGroupConfig {
    pub net_charge: i32,
    pub multiplicity: u32,
    pub level: LevelOfTheory,
    pub surface_hopping: Option<SurfaceHopping>,
}

impl From<&QmGroupConfig> for LayerSettings {
    fn from(config: &QmGroupConfig) -> Self {
        LayerSettings {
            net_charge: config.net_charge,
            multiplicity: config.multiplicity,
            level: config.level,
            surface_hopping: config.surface_hopping,
        }
    }
}

#[derive(Default)]
pub struct QmGroupConfigBuilder {
    net_charge: Option<i32>,
    multiplicity: Option<u32>,
    method: Option<QmMethod>,
    basis: Option<QmBasis>,
    surface_hopping: Option<SurfaceHopping>,
}

impl QmGroupConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn net_charge(mut self, charge: i32) -> Self {
        self.net_charge = Some(charge);
        self
    }
    pub fn multiplicity(mut self, multiplicity: u32) -> Self {
        self.multiplicity = Some(multiplicity);
        self
    }
    pub fn method(mut self, method: QmMethod) -> Self {
        self.method = Some(method);
        self
    }
    pub fn basis(mut self, basis: QmBasis) -> Self {
        self.basis = Some(basis);
        self
    }
    pub fn surface_hopping(mut self, params: SurfaceHopping) -> Self {
        self.surface_hopping = Some(params);
        self
    }

    /// Net charge defaults to 0 and multiplicity to 1; method and basis are required.
    pub fn build(self) -> Result<QmGroupConfig, ConfigError> {
        let multiplicity = self.multiplicity.unwrap_or(1);
        if multiplicity == 0 {
            return Err(ConfigError::InvalidMultiplicity(multiplicity));
        }
        Ok(QmGroupConfig {
            net_charge: self.net_charge.unwrap_or(0),
            multiplicity,
            level: LevelOfTheory::new(
                self.method.ok_or(ConfigError::MissingParameter("method"))?,
                self.basis.ok_or(ConfigError::MissingParameter("basis"))?,
            ),
            surface_hopping: self.surface_hopping,
        })
    }
}

/// The immutable coupling configuration, built once at setup.
///
/// Groups are listed from the innermost to the outermost; in the ONIOM scheme group `i`
/// configures layer `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct CouplingConfig {
    pub scheme: CouplingScheme,
    pub scale_factor: f64,
    pub groups: Vec<QmGroupConfig>,
}

#[derive(Default)]
pub struct CouplingConfigBuilder {
    scheme: Option<CouplingScheme>,
    scale_factor: Option<f64>,
    groups: Vec<QmGroupConfig>,
}

impl CouplingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scheme(mut self, scheme: CouplingScheme) -> Self {
        self.scheme = Some(scheme);
        self
    }
    pub fn scale_factor(mut self, factor: f64) -> Self {
        self.scale_factor = Some(factor);
        self
    }
    pub fn group(mut self, group: QmGroupConfig) -> Self {
        self.groups.push(group);
        self
    }
    pub fn groups(mut self, groups: impl IntoIterator<Item = QmGroupConfig>) -> Self {
        self.groups.extend(groups);
        self
    }

    pub fn build(self) -> Result<CouplingConfig, ConfigError> {
        let scale_factor = self.scale_factor.unwrap_or(1.0);
        if !scale_factor.is_finite() {
            return Err(ConfigError::InvalidScaleFactor(scale_factor));
        }
        if self.groups.is_empty() {
            return Err(ConfigError::NoQmGroups);
        }
        Ok(CouplingConfig {
            scheme: self
                .scheme
                .ok_or(ConfigError::MissingParameter("scheme"))?,
            scale_factor,
            groups: self.groups,
        })
    }
}
