use super::prepare;
use crate::cli::InspectArgs;
use crate::error::Result;
use qmmmpp::workflows::coupling::QmmmCoupling;
use std::fmt::Write;
use tracing::info;

pub fn run(args: InspectArgs) -> Result<()> {
    let prepared = prepare(&args.setup)?;
    info!(
        layers = prepared.coupling.layers().len(),
        atoms = prepared.system.topology.len(),
        "Coupling set up."
    );
    print!("{}", render_layers(&prepared.coupling));
    Ok(())
}

/// One header line for the run, then one line per layer from the innermost outwards.
pub fn render_layers(coupling: &QmmmCoupling) -> String {
    let config = coupling.config();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Scheme: {} (scale factor {}), {} QM atom(s)",
        config.scheme,
        config.scale_factor,
        coupling.qm_atoms().len()
    );
    for (index, (layer, backend)) in coupling
        .layers()
        .iter()
        .zip(coupling.backends())
        .enumerate()
    {
        let _ = write!(
            out,
            "Layer {}: atoms {:?}, {} electrons, charge {}, multiplicity {}, {}, backend {}",
            index,
            layer.atom_indices(),
            layer.electron_count(),
            layer.net_charge(),
            layer.multiplicity(),
            layer.level(),
            backend
        );
        if let Some(sh) = layer.surface_hopping() {
            let _ = write!(
                out,
                ", surface hopping ({} orbitals, {} electrons)",
                sh.cas_orbitals, sh.cas_electrons
            );
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;

    const ONIOM_SYSTEM: &str = r#"
        [box]
        vectors = [[4.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 4.0]]

        [[atoms]]
        atomic-number = 8
        charge = -0.8
        qm-group = 0
        position = [1.0, 1.0, 1.0]

        [[atoms]]
        atomic-number = 1
        charge = 0.4
        qm-group = 0
        position = [1.1, 1.0, 1.0]

        [[atoms]]
        atomic-number = 6
        charge = 0.2
        qm-group = 1
        position = [1.3, 1.0, 1.0]

        [[atoms]]
        atomic-number = 1
        charge = 0.2
        position = [2.5, 2.5, 2.5]
    "#;

    const ONIOM_CONFIG: &str = r#"
        scheme = "oniom"
        backends = ["gamess", "mopac"]

        [[groups]]
        method = "b3lyp"
        basis = "6-31g*"
        charge = -1

        [[groups]]
        method = "pm3"
        basis = "sto-3g"
        multiplicity = 2
    "#;

    #[test]
    fn normal_run_renders_a_single_layer() {
        let dir = tempfile::tempdir().unwrap();
        let args = write_inputs(&dir, NORMAL_CONFIG, BOUNDARY_SYSTEM);
        let prepared = prepare(&args).unwrap();

        let rendered = render_layers(&prepared.coupling);

        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "Scheme: normal (scale factor 0.5), 1 QM atom(s)");
        assert_eq!(
            lines[1],
            "Layer 0: atoms [0], 8 electrons, charge 0, multiplicity 1, RHF/STO-3G, backend gamess"
        );
    }

    #[test]
    fn oniom_run_renders_nested_layers_with_their_backends() {
        let dir = tempfile::tempdir().unwrap();
        let args = write_inputs(&dir, ONIOM_CONFIG, ONIOM_SYSTEM);
        let prepared = prepare(&args).unwrap();

        let rendered = render_layers(&prepared.coupling);

        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[1],
            "Layer 0: atoms [0, 1], 10 electrons, charge -1, multiplicity 1, B3LYP/6-31G*, backend gamess"
        );
        assert_eq!(
            lines[2],
            "Layer 1: atoms [0, 1, 2], 15 electrons, charge 0, multiplicity 2, PM3/STO-3G, backend mopac"
        );
    }
}
