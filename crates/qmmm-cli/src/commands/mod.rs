pub mod environment;
pub mod inspect;

use crate::cli::SetupArgs;
use crate::config::PartialCouplingConfig;
use crate::error::Result;
use qmmmpp::core::io::system_file::SystemSnapshot;
use qmmmpp::core::models::environment::MmEnvironment;
use qmmmpp::core::models::layer::QmLayer;
use qmmmpp::core::qm::engine::{EngineRegistry, QmEngine, QmEvaluation, SolverError};
use qmmmpp::workflows::coupling::QmmmCoupling;
use tracing::info;

/// Stands in for an external QM program when only setup and bookkeeping are needed.
///
/// Initialization always succeeds; evaluation is refused.
#[derive(Debug, Default)]
struct DryRunEngine;

impl QmEngine for DryRunEngine {
    fn initialize(
        &mut self,
        _: &QmLayer,
        _: &MmEnvironment,
    ) -> std::result::Result<(), SolverError> {
        Ok(())
    }

    fn evaluate(
        &mut self,
        _: &QmLayer,
        _: &MmEnvironment,
    ) -> std::result::Result<QmEvaluation, SolverError> {
        Err(SolverError::Backend(
            "the CLI does not run QM calculations".to_string(),
        ))
    }
}

/// A system with a coupling set up on it.
pub struct Prepared {
    pub system: SystemSnapshot,
    pub coupling: QmmmCoupling,
}

/// Loads the configuration and system named by `args` and runs the coupling setup.
///
/// Every available backend is served by a [`DryRunEngine`].
pub fn prepare(args: &SetupArgs) -> Result<Prepared> {
    let resolved = PartialCouplingConfig::from_file(&args.config)?.merge_with_cli(args)?;

    info!("Loading system snapshot from {:?}", &args.system);
    let mut system = SystemSnapshot::load(&args.system)?;

    let mut engines = EngineRegistry::new();
    for backend in resolved.backends.iter() {
        engines.register(backend, Box::new(DryRunEngine));
    }

    let coupling = QmmmCoupling::setup(
        &mut system.topology,
        resolved.coupling,
        &resolved.run,
        &mut engines,
    )?;

    Ok(Prepared { system, coupling })
}
