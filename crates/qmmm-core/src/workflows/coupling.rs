use crate::core::models::environment::MmEnvironment;
use crate::core::models::frame::Frame;
use crate::core::models::layer::QmLayer;
use crate::core::models::topology::Topology;
use crate::core::neighbors::NeighborList;
use crate::core::qm::backend::QmBackend;
use crate::core::qm::engine::EngineRegistry;
use crate::engine::classifier::{AtomClassifier, Classification};
use crate::engine::combiner::OniomCombiner;
use crate::engine::config::{CouplingConfig, RunParameters};
use crate::engine::error::QmmmError;
use crate::engine::forces::ForceAccumulator;
use crate::engine::updater::EnvironmentUpdater;
use tracing::{debug, info, instrument};

/// A configured QM/MM coupling, ready to be stepped by the classical integrator.
#[derive(Debug)]
pub struct QmmmCoupling {
    config: CouplingConfig,
    classification: Classification,
    environment: MmEnvironment,
    updater: EnvironmentUpdater,
    combiner: OniomCombiner,
    step: u64,
}

impl QmmmCoupling {
    /// Prepares the coupling for `topology`.
    ///
    /// In the Normal scheme the classical charges of all QM atoms in `topology` are set to
    /// zero. Single-layer runs initialize their QM engine here; multi-layer runs
    /// initialize before every evaluation instead.
    ///
    /// # Errors
    ///
    /// Returns [`QmmmError::Configuration`] for unsupported runs, inconsistent group
    /// assignments or levels of theory no registered engine can evaluate, and
    /// [`QmmmError::Solver`] if the initial engine setup fails.
    #[instrument(skip_all, name = "qmmm_setup")]
    pub fn setup(
        topology: &mut Topology,
        config: CouplingConfig,
        run: &RunParameters,
        engines: &mut EngineRegistry,
    ) -> Result<Self, QmmmError> {
        let classification = AtomClassifier::new(&config).classify(topology, run)?;
        let combiner = OniomCombiner::for_layers(&classification.layers, &engines.available())?;
        let environment = MmEnvironment::new(config.scale_factor);

        if !combiner.reinitializes_every_call() {
            let backend = combiner.backends()[0];
            let engine = engines.engine_mut(backend).ok_or_else(|| {
                QmmmError::inconsistent(0, format!("no QM engine registered for backend '{backend}'"))
            })?;
            engine
                .initialize(&classification.layers[0], &environment)
                .map_err(|source| QmmmError::Solver {
                    layer: 0,
                    step: 0,
                    source,
                })?;
        }

        for (index, backend) in combiner.backends().iter().enumerate() {
            info!(layer = index, backend = %backend, "QM backend selected.");
        }

        Ok(Self {
            config,
            classification,
            environment,
            updater: EnvironmentUpdater::new(),
            combiner,
            step: 0,
        })
    }

    /// Refreshes shifts, shifted coordinates and the MM environment for the current step.
    pub fn update_environment(
        &mut self,
        frame: &Frame,
        neighbors: &NeighborList,
    ) -> Result<(), QmmmError> {
        self.check_frame(frame)?;
        self.updater.update(
            self.config.scheme,
            &mut self.classification.layers,
            &mut self.environment,
            &self.classification.qm_mask,
            frame,
            neighbors,
            self.step,
        )
    }

    /// Evaluates the QM engines on the current layers and environment.
    ///
    /// Forces and shift forces are added to `forces`; the QM energy is returned.
    pub fn calculate(
        &mut self,
        engines: &mut EngineRegistry,
        forces: &mut ForceAccumulator,
    ) -> Result<f64, QmmmError> {
        if forces.forces().len() != self.classification.qm_mask.len() {
            return Err(QmmmError::inconsistent(
                self.step,
                format!(
                    "force array holds {} atoms, topology has {}",
                    forces.forces().len(),
                    self.classification.qm_mask.len()
                ),
            ));
        }
        self.combiner.combine(
            &self.classification.layers,
            &self.environment,
            engines,
            forces,
            self.step,
        )
    }

    /// Runs one full step: environment update followed by QM evaluation.
    #[instrument(skip_all, name = "qmmm_step", fields(step = self.step))]
    pub fn step(
        &mut self,
        frame: &Frame,
        neighbors: &NeighborList,
        engines: &mut EngineRegistry,
        forces: &mut ForceAccumulator,
    ) -> Result<f64, QmmmError> {
        self.update_environment(frame, neighbors)?;
        let energy = self.calculate(engines, forces)?;
        debug!(energy, mm_atoms = self.environment.len(), "QM/MM step complete.");
        self.step += 1;
        Ok(energy)
    }

    pub fn config(&self) -> &CouplingConfig {
        &self.config
    }

    pub fn layers(&self) -> &[QmLayer] {
        &self.classification.layers
    }

    pub fn groups(&self) -> &[Vec<usize>] {
        &self.classification.groups
    }

    pub fn environment(&self) -> &MmEnvironment {
        &self.environment
    }

    pub fn backends(&self) -> &[QmBackend] {
        self.combiner.backends()
    }

    pub fn is_qm(&self, index: usize) -> bool {
        self.classification.qm_mask.get(index).copied().unwrap_or(false)
    }

    /// All QM atoms in ascending order.
    pub fn qm_atoms(&self) -> Vec<usize> {
        self.classification
            .qm_mask
            .iter()
            .enumerate()
            .filter_map(|(index, &is_qm)| is_qm.then_some(index))
            .collect()
    }

    /// Number of completed steps.
    pub fn current_step(&self) -> u64 {
        self.step
    }

    fn check_frame(&self, frame: &Frame) -> Result<(), QmmmError> {
        let expected = self.classification.qm_mask.len();
        let mismatch = |what: &str, found: usize| {
            QmmmError::inconsistent(
                self.step,
                format!("frame has {found} {what}, topology has {expected} atoms"),
            )
        };
        if frame.positions.len() != expected {
            return Err(mismatch("positions", frame.positions.len()));
        }
        if frame.charges_a.len() != expected {
            return Err(mismatch("A-state charges", frame.charges_a.len()));
        }
        if let Some(charges_b) = frame.charges_b {
            if charges_b.len() != expected {
                return Err(mismatch("B-state charges", charges_b.len()));
            }
        }
        Ok(())
    }
}
