use super::method::{LevelOfTheory, QmMethod, UnknownNameError};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// An external QM program family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QmBackend {
    /// Semi-empirical solver.
    Mopac,
    Gamess,
    Gaussian,
    Orca,
}

/// Ab-initio backends in the order they are preferred when several are available.
const AB_INITIO_PREFERENCE: [QmBackend; 3] =
    [QmBackend::Gamess, QmBackend::Gaussian, QmBackend::Orca];

impl QmBackend {
    pub fn name(self) -> &'static str {
        match self {
            QmBackend::Mopac => "mopac",
            QmBackend::Gamess => "gamess",
            QmBackend::Gaussian => "gaussian",
            QmBackend::Orca => "orca",
        }
    }
}

impl fmt::Display for QmBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for QmBackend {
    type Err = UnknownNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mopac" => Ok(QmBackend::Mopac),
            "gamess" | "gamess-uk" => Ok(QmBackend::Gamess),
            "gaussian" => Ok(QmBackend::Gaussian),
            "orca" => Ok(QmBackend::Orca),
            _ => Err(UnknownNameError {
                kind: "QM backend",
                name: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Semi-empirical QM ({level}) is only supported with Mopac")]
    SemiEmpiricalRequiresMopac { level: LevelOfTheory },

    #[error("Ab-initio surface hopping ({level}) is only supported with Gaussian")]
    SurfaceHoppingRequiresGaussian { level: LevelOfTheory },

    #[error("Ab-initio calculation ({level}) requires one of Gamess, Gaussian or ORCA")]
    NoAbInitioBackend { level: LevelOfTheory },
}

/// The set of backends available to this run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendSet {
    backends: BTreeSet<QmBackend>,
}

impl BackendSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, backend: QmBackend) -> bool {
        self.backends.insert(backend)
    }

    pub fn contains(&self, backend: QmBackend) -> bool {
        self.backends.contains(&backend)
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = QmBackend> + '_ {
        self.backends.iter().copied()
    }
}

impl FromIterator<QmBackend> for BackendSet {
    fn from_iter<I: IntoIterator<Item = QmBackend>>(iter: I) -> Self {
        Self {
            backends: iter.into_iter().collect(),
        }
    }
}

/// Chooses the backend that evaluates a level of theory.
///
/// Semi-empirical methods go to Mopac, CASSCF surface hopping goes to Gaussian and
/// every other ab-initio request goes to the first available of Gamess, Gaussian and
/// ORCA. There is no runtime fallback: a combination without a matching backend is a
/// configuration error.
pub fn select_backend(
    level: &LevelOfTheory,
    surface_hopping: bool,
    available: &BackendSet,
) -> Result<QmBackend, BackendError> {
    let level = *level;

    if level.method.is_semi_empirical() {
        return if available.contains(QmBackend::Mopac) {
            Ok(QmBackend::Mopac)
        } else {
            Err(BackendError::SemiEmpiricalRequiresMopac { level })
        };
    }

    if surface_hopping && level.method == QmMethod::Casscf {
        return if available.contains(QmBackend::Gaussian) {
            Ok(QmBackend::Gaussian)
        } else {
            Err(BackendError::SurfaceHoppingRequiresGaussian { level })
        };
    }

    AB_INITIO_PREFERENCE
        .into_iter()
        .find(|&backend| available.contains(backend))
        .ok_or(BackendError::NoAbInitioBackend { level })
}
