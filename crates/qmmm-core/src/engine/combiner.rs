use super::config::ConfigError;
use super::error::QmmmError;
use super::forces::ForceAccumulator;
use crate::core::models::environment::MmEnvironment;
use crate::core::models::layer::QmLayer;
use crate::core::qm::backend::{BackendSet, QmBackend, select_backend};
use crate::core::qm::engine::{EngineRegistry, QmEvaluation, SolverError};
use tracing::{debug, instrument};

/// Turns per-layer QM results into one energy and scatters forces.
///
/// With a single layer the QM engine is evaluated once, on the layer plus the MM point
/// charges. With `N` nested layers the energy is
///
/// ```text
/// E = sum_{i < N-1} [ E(layer_i @ level_i) - E(layer_i @ level_{i+1}) ] + E(layer_{N-1} @ level_{N-1})
/// ```
///
/// and gradients are combined the same way on each layer's atoms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OniomCombiner {
    backends: Vec<QmBackend>,
}

impl OniomCombiner {
    /// Selects the backend for every layer from the backends available to the run.
    ///
    /// The low-level copy of layer `i` is evaluated at layer `i + 1`'s level of theory
    /// and therefore by layer `i + 1`'s backend.
    pub fn for_layers(layers: &[QmLayer], available: &BackendSet) -> Result<Self, ConfigError> {
        let backends = layers
            .iter()
            .map(|layer| {
                select_backend(&layer.level(), layer.surface_hopping().is_some(), available)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { backends })
    }

    pub fn backends(&self) -> &[QmBackend] {
        &self.backends
    }

    /// Whether the engine must be re-initialized before every evaluation.
    pub fn reinitializes_every_call(&self) -> bool {
        self.backends.len() > 1
    }

    /// Evaluates all layers for the current step and returns the QM energy.
    #[instrument(skip_all, name = "qm_combination", fields(step = step, layers = layers.len()))]
    pub fn combine(
        &self,
        layers: &[QmLayer],
        environment: &MmEnvironment,
        engines: &mut EngineRegistry,
        forces: &mut ForceAccumulator,
        step: u64,
    ) -> Result<f64, QmmmError> {
        if layers.len() != self.backends.len() {
            return Err(QmmmError::inconsistent(
                step,
                format!(
                    "{} QM layers but {} selected backends",
                    layers.len(),
                    self.backends.len()
                ),
            ));
        }

        match layers {
            [] => Err(QmmmError::inconsistent(step, "no QM layers to evaluate")),
            [layer] => {
                let result = self.evaluate(engines, 0, self.backends[0], layer, environment, false, step)?;
                scatter(forces, layer, environment, &result.gradient, &result.shift_forces, step)?;
                debug!(energy = result.energy, "Single-layer QM energy evaluated.");
                Ok(result.energy)
            }
            _ => self.combine_oniom(layers, environment, engines, forces, step),
        }
    }

    fn combine_oniom(
        &self,
        layers: &[QmLayer],
        environment: &MmEnvironment,
        engines: &mut EngineRegistry,
        forces: &mut ForceAccumulator,
        step: u64,
    ) -> Result<f64, QmmmError> {
        check_nesting(layers, step)?;

        // Contributions are held back until every layer has been evaluated.
        let mut pending = Vec::with_capacity(layers.len());
        let mut energy = 0.0;
        for (index, pair) in layers.windows(2).enumerate() {
            let (layer, enclosing) = (&pair[0], &pair[1]);

            let high = self.evaluate(engines, index, self.backends[index], layer, environment, true, step)?;
            let low_layer = layer.with_level_of(enclosing);
            let low = self.evaluate(engines, index, self.backends[index + 1], &low_layer, environment, true, step)?;

            let gradient: Vec<_> = high.gradient.iter().zip(&low.gradient).map(|(h, l)| h - l).collect();
            let shift_forces: Vec<_> = high
                .shift_forces
                .iter()
                .zip(&low.shift_forces)
                .map(|(h, l)| h - l)
                .collect();
            pending.push((layer, gradient, shift_forces));

            debug!(
                layer = index,
                high = high.energy,
                low = low.energy,
                "ONIOM layer correction evaluated."
            );
            energy += high.energy - low.energy;
        }

        let outer_index = layers.len() - 1;
        let outer = &layers[outer_index];
        let result = self.evaluate(engines, outer_index, self.backends[outer_index], outer, environment, true, step)?;
        debug!(layer = outer_index, energy = result.energy, "Outermost ONIOM layer evaluated.");
        pending.push((outer, result.gradient, result.shift_forces));

        for (layer, gradient, shift_forces) in &pending {
            scatter(forces, layer, environment, gradient, shift_forces, step)?;
        }

        Ok(energy + result.energy)
    }

    #[allow(clippy::too_many_arguments)]
    fn evaluate(
        &self,
        engines: &mut EngineRegistry,
        layer_index: usize,
        backend: QmBackend,
        layer: &QmLayer,
        environment: &MmEnvironment,
        initialize: bool,
        step: u64,
    ) -> Result<QmEvaluation, QmmmError> {
        let solver_error = |source: SolverError| QmmmError::Solver {
            layer: layer_index,
            step,
            source,
        };
        let engine = engines.engine_mut(backend).ok_or_else(|| {
            QmmmError::inconsistent(step, format!("no QM engine registered for backend '{backend}'"))
        })?;

        if initialize {
            engine.initialize(layer, environment).map_err(solver_error)?;
        }
        let result = engine.evaluate(layer, environment).map_err(solver_error)?;
        result
            .validate(layer.len() + environment.len())
            .map_err(solver_error)?;
        Ok(result)
    }
}

/// Requires every layer to be contained in the layer that follows it.
fn check_nesting(layers: &[QmLayer], step: u64) -> Result<(), QmmmError> {
    for (index, pair) in layers.windows(2).enumerate() {
        let (inner, outer) = (&pair[0], &pair[1]);
        if inner.len() > outer.len() {
            return Err(QmmmError::inconsistent(
                step,
                format!(
                    "layer {index} has {} atoms but its enclosing layer has only {}",
                    inner.len(),
                    outer.len()
                ),
            ));
        }
        if let Some(atom) = inner.atom_indices().iter().find(|&&atom| !outer.contains(atom)) {
            return Err(QmmmError::inconsistent(
                step,
                format!("atom {atom} of layer {index} is missing from layer {}", index + 1),
            ));
        }
    }
    Ok(())
}

/// Writes one evaluation into the force arrays: QM atoms first, then MM point charges.
fn scatter(
    forces: &mut ForceAccumulator,
    layer: &QmLayer,
    environment: &MmEnvironment,
    gradient: &[nalgebra::Vector3<f64>],
    shift_forces: &[nalgebra::Vector3<f64>],
    step: u64,
) -> Result<(), QmmmError> {
    let atoms = layer
        .atom_indices()
        .iter()
        .zip(layer.shifts())
        .chain(environment.atom_indices().iter().zip(environment.shifts()));

    for ((&index, &shift), (g, s)) in atoms.zip(gradient.iter().zip(shift_forces)) {
        forces
            .accumulate(index, shift, g, s)
            .map_err(|e| QmmmError::inconsistent(step, e.to_string()))?;
    }
    Ok(())
}
