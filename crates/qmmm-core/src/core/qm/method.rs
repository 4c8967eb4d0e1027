use phf::{Map, phf_map};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown {kind} name: '{name}'")]
pub struct UnknownNameError {
    pub kind: &'static str,
    pub name: String,
}

/// A QM method understood by at least one backend family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QmMethod {
    Am1,
    Pm3,
    Rhf,
    Uhf,
    Dft,
    B3lyp,
    Mp2,
    Casscf,
    B3lypLan,
    Direct,
}

/// A Gaussian-type basis set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QmBasis {
    Sto3G,
    Pople321G,
    Pople321GStar,
    Pople321PlusGStar,
    Pople621G,
    Pople631G,
    Pople631GStar,
    Pople631PlusGStar,
    Pople6311G,
}

static METHOD_NAMES: Map<&'static str, QmMethod> = phf_map! {
    "am1" => QmMethod::Am1,
    "pm3" => QmMethod::Pm3,
    "rhf" => QmMethod::Rhf,
    "uhf" => QmMethod::Uhf,
    "dft" => QmMethod::Dft,
    "b3lyp" => QmMethod::B3lyp,
    "mp2" => QmMethod::Mp2,
    "casscf" => QmMethod::Casscf,
    "b3lyplan" => QmMethod::B3lypLan,
    "direct" => QmMethod::Direct,
};

static BASIS_NAMES: Map<&'static str, QmBasis> = phf_map! {
    "sto-3g" => QmBasis::Sto3G,
    "sto3g" => QmBasis::Sto3G,
    "3-21g" => QmBasis::Pople321G,
    "3-21g*" => QmBasis::Pople321GStar,
    "3-21+g*" => QmBasis::Pople321PlusGStar,
    "6-21g" => QmBasis::Pople621G,
    "6-31g" => QmBasis::Pople631G,
    "6-31g*" => QmBasis::Pople631GStar,
    "6-31+g*" => QmBasis::Pople631PlusGStar,
    "6-311g" => QmBasis::Pople6311G,
};

impl QmMethod {
    /// Semi-empirical methods are served by a different backend family than
    /// ab-initio ones.
    pub fn is_semi_empirical(self) -> bool {
        matches!(self, QmMethod::Am1 | QmMethod::Pm3)
    }

    pub fn name(self) -> &'static str {
        match self {
            QmMethod::Am1 => "AM1",
            QmMethod::Pm3 => "PM3",
            QmMethod::Rhf => "RHF",
            QmMethod::Uhf => "UHF",
            QmMethod::Dft => "DFT",
            QmMethod::B3lyp => "B3LYP",
            QmMethod::Mp2 => "MP2",
            QmMethod::Casscf => "CASSCF",
            QmMethod::B3lypLan => "B3LYPLAN",
            QmMethod::Direct => "DIRECT",
        }
    }
}

impl QmBasis {
    pub fn name(self) -> &'static str {
        match self {
            QmBasis::Sto3G => "STO-3G",
            QmBasis::Pople321G => "3-21G",
            QmBasis::Pople321GStar => "3-21G*",
            QmBasis::Pople321PlusGStar => "3-21+G*",
            QmBasis::Pople621G => "6-21G",
            QmBasis::Pople631G => "6-31G",
            QmBasis::Pople631GStar => "6-31G*",
            QmBasis::Pople631PlusGStar => "6-31+G*",
            QmBasis::Pople6311G => "6-311G",
        }
    }
}

impl FromStr for QmMethod {
    type Err = UnknownNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        METHOD_NAMES
            .get(s.trim().to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| UnknownNameError {
                kind: "QM method",
                name: s.to_string(),
            })
    }
}

impl FromStr for QmBasis {
    type Err = UnknownNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BASIS_NAMES
            .get(s.trim().to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| UnknownNameError {
                kind: "basis set",
                name: s.to_string(),
            })
    }
}

impl fmt::Display for QmMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for QmBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A (method, basis) pair fixing the accuracy/cost trade-off of a QM calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LevelOfTheory {
    pub method: QmMethod,
    pub basis: QmBasis,
}

impl LevelOfTheory {
    pub fn new(method: QmMethod, basis: QmBasis) -> Self {
        Self { method, basis }
    }
}

impl fmt::Display for LevelOfTheory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.method, self.basis)
    }
}
