use super::prepare;
use crate::cli::EnvironmentArgs;
use crate::error::{CliError, Result};
use qmmmpp::core::io::system_file::SystemSnapshot;
use qmmmpp::core::models::frame::Frame;
use qmmmpp::core::neighbors::NeighborList;
use qmmmpp::workflows::coupling::QmmmCoupling;
use std::fmt::Write;
use tracing::info;

pub fn run(args: EnvironmentArgs) -> Result<()> {
    let mut prepared = prepare(&args.setup)?;
    update_once(&mut prepared.coupling, &prepared.system, args.cutoff)?;
    print!("{}", render_environment(&prepared.coupling));
    Ok(())
}

/// Builds a neighbor list for `system` and runs a single environment update on it.
///
/// Charges are taken from the topology after setup, so QM charges zeroed by the Normal
/// scheme are seen as such.
pub fn update_once(
    coupling: &mut QmmmCoupling,
    system: &SystemSnapshot,
    cutoff: f64,
) -> Result<()> {
    if !cutoff.is_finite() || cutoff <= 0.0 {
        return Err(CliError::Argument(format!(
            "cutoff must be a positive distance in nm, got {}",
            cutoff
        )));
    }

    let neighbors = NeighborList::build(
        &system.topology,
        &system.positions,
        &system.sim_box,
        &coupling.qm_atoms(),
        cutoff,
    )?;
    info!(rows = neighbors.len(), cutoff, "Neighbor list built.");

    let charges_a = system.topology.charges_a();
    let charges_b = system.topology.charges_b();
    let frame = Frame::new(
        &system.positions,
        &system.sim_box,
        &charges_a,
        charges_b.as_deref(),
    );
    coupling.update_environment(&frame, &neighbors)?;
    Ok(())
}

/// QM atoms per layer with their shifts, followed by the MM point charges.
pub fn render_environment(coupling: &QmmmCoupling) -> String {
    let mut out = String::new();
    for (index, layer) in coupling.layers().iter().enumerate() {
        let _ = writeln!(out, "Layer {} QM atoms:", index);
        for ((atom, shift), position) in layer
            .atom_indices()
            .iter()
            .zip(layer.shifts())
            .zip(layer.shifted_coordinates())
        {
            let _ = writeln!(
                out,
                "  {:>6} shift {} at ({:.4}, {:.4}, {:.4})",
                atom, shift, position.x, position.y, position.z
            );
        }
    }

    let environment = coupling.environment();
    let _ = writeln!(
        out,
        "MM environment: {} atom(s), scale factor {}",
        environment.len(),
        environment.scale_factor()
    );
    for (((atom, shift), charge), position) in environment
        .atom_indices()
        .iter()
        .zip(environment.shifts())
        .zip(environment.scaled_charges())
        .zip(environment.shifted_coordinates())
    {
        let _ = writeln!(
            out,
            "  {:>6} shift {} charge {:+.4} at ({:.4}, {:.4}, {:.4})",
            atom, shift, charge, position.x, position.y, position.z
        );
    }
    out
}
