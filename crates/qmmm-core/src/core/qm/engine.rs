use super::backend::{BackendSet, QmBackend};
use crate::core::models::environment::MmEnvironment;
use crate::core::models::layer::QmLayer;
use nalgebra::Vector3;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolverError {
    #[error("QM calculation did not converge: {0}")]
    Diverged(String),
    #[error("QM backend failed: {0}")]
    Backend(String),
    #[error("QM result has {found} gradient entries, expected {expected}")]
    MalformedResult { expected: usize, found: usize },
    #[error("QM energy is not finite: {0}")]
    NonFiniteEnergy(f64),
}

/// The outcome of one QM evaluation.
///
/// `gradient` and `shift_forces` hold one entry per QM atom of the evaluated layer,
/// followed by one entry per MM point charge, in the same order as the layer and the
/// environment list them.
#[derive(Debug, Clone, PartialEq)]
pub struct QmEvaluation {
    pub energy: f64,
    /// Energy gradient; subtracted from the classical forces.
    pub gradient: Vec<Vector3<f64>>,
    /// Shift-force contributions; added to the classical shift-force table.
    pub shift_forces: Vec<Vector3<f64>>,
}

impl QmEvaluation {
    pub fn validate(&self, expected_len: usize) -> Result<(), SolverError> {
        if !self.energy.is_finite() {
            return Err(SolverError::NonFiniteEnergy(self.energy));
        }
        for found in [self.gradient.len(), self.shift_forces.len()] {
            if found != expected_len {
                return Err(SolverError::MalformedResult {
                    expected: expected_len,
                    found,
                });
            }
        }
        Ok(())
    }
}

/// An external QM solver.
///
/// The two phases are explicit: `initialize` prepares solver state for an atom set and
/// level of theory, `evaluate` computes energy and gradient for the current coordinates.
/// Callers re-initialize whenever the level of theory for the same atoms changes.
pub trait QmEngine {
    fn initialize(
        &mut self,
        layer: &QmLayer,
        environment: &MmEnvironment,
    ) -> Result<(), SolverError>;

    fn evaluate(
        &mut self,
        layer: &QmLayer,
        environment: &MmEnvironment,
    ) -> Result<QmEvaluation, SolverError>;
}

/// The QM engines available to a run, keyed by backend family.
#[derive(Default)]
pub struct EngineRegistry {
    engines: BTreeMap<QmBackend, Box<dyn QmEngine>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an engine, returning the one it replaces.
    pub fn register(
        &mut self,
        backend: QmBackend,
        engine: Box<dyn QmEngine>,
    ) -> Option<Box<dyn QmEngine>> {
        self.engines.insert(backend, engine)
    }

    pub fn with_engine(mut self, backend: QmBackend, engine: Box<dyn QmEngine>) -> Self {
        self.register(backend, engine);
        self
    }

    pub fn available(&self) -> BackendSet {
        self.engines.keys().copied().collect()
    }

    pub fn engine_mut(&mut self, backend: QmBackend) -> Option<&mut dyn QmEngine> {
        self.engines
            .get_mut(&backend)
            .map(|engine| engine.as_mut() as &mut dyn QmEngine)
    }
}

impl std::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("backends", &self.engines.keys().collect::<Vec<_>>())
            .finish()
    }
}
