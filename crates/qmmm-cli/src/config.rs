use crate::cli::SetupArgs;
use crate::error::{CliError, Result};
use qmmmpp::core::models::layer::SurfaceHopping;
use qmmmpp::core::qm::backend::{BackendSet, QmBackend};
use qmmmpp::core::qm::method::{QmBasis, QmMethod};
use qmmmpp::engine::config as core_config;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
struct PartialRunConfig {
    ranks: Option<usize>,
    #[serde(rename = "cutoff-scheme")]
    cutoff_scheme: Option<String>,
    integrator: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct PartialSurfaceHoppingConfig {
    #[serde(rename = "cas-orbitals")]
    cas_orbitals: Option<u32>,
    #[serde(rename = "cas-electrons")]
    cas_electrons: Option<u32>,
    #[serde(rename = "sa-steps")]
    sa_steps: Option<u32>,
    #[serde(rename = "sa-on")]
    sa_on: Option<f64>,
    #[serde(rename = "sa-off")]
    sa_off: Option<f64>,
    #[serde(rename = "sa-step")]
    sa_step: Option<u32>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
struct PartialGroupConfig {
    method: Option<String>,
    basis: Option<String>,
    charge: Option<i32>,
    multiplicity: Option<u32>,
    #[serde(rename = "surface-hopping")]
    surface_hopping: Option<PartialSurfaceHoppingConfig>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct PartialCouplingConfig {
    scheme: Option<String>,
    #[serde(rename = "scale-factor")]
    scale_factor: Option<f64>,
    #[serde(default)]
    backends: Vec<String>,
    run: Option<PartialRunConfig>,
    #[serde(default)]
    groups: Vec<PartialGroupConfig>,
}

/// Everything a subcommand needs to set up a coupling.
#[derive(Debug, Clone)]
pub struct ResolvedSetup {
    pub coupling: core_config::CouplingConfig,
    pub run: core_config::RunParameters,
    pub backends: BackendSet,
}

fn parse_name<T>(value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| CliError::Config(e.to_string()))
}

impl PartialCouplingConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading coupling configuration from: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn merge_with_cli(mut self, args: &SetupArgs) -> Result<ResolvedSetup> {
        self.apply_set_values(&args.set_values)?;

        let run = Self::merge_run(self.run.take().unwrap_or_default())?;

        let backend_names = if args.backends.is_empty() {
            &self.backends
        } else {
            &args.backends
        };
        let backends = backend_names
            .iter()
            .map(|name| parse_name::<QmBackend>(name))
            .collect::<Result<BackendSet>>()?;

        let scheme = self.scheme.as_deref().ok_or_else(|| {
            CliError::Config("`scheme` is required in the config file.".to_string())
        })?;

        let groups = self
            .groups
            .into_iter()
            .enumerate()
            .map(|(index, group)| Self::merge_group(index, group))
            .collect::<Result<Vec<_>>>()?;

        let mut builder = core_config::CouplingConfigBuilder::new()
            .scheme(parse_name(scheme)?)
            .groups(groups);
        if let Some(factor) = args.scale_factor.or(self.scale_factor) {
            builder = builder.scale_factor(factor);
        }
        let coupling = builder
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        Ok(ResolvedSetup {
            coupling,
            run,
            backends,
        })
    }

    fn merge_run(partial: PartialRunConfig) -> Result<core_config::RunParameters> {
        let defaults = core_config::RunParameters::default();
        Ok(core_config::RunParameters {
            ranks: partial.ranks.unwrap_or(defaults.ranks),
            cutoff_scheme: match partial.cutoff_scheme {
                Some(name) => parse_name(&name)?,
                None => defaults.cutoff_scheme,
            },
            integrator: match partial.integrator {
                Some(name) => parse_name(&name)?,
                None => defaults.integrator,
            },
        })
    }

    fn merge_group(
        index: usize,
        partial: PartialGroupConfig,
    ) -> Result<core_config::QmGroupConfig> {
        let required = |value: Option<String>, key: &str| {
            value.ok_or_else(|| {
                CliError::Config(format!("`groups[{}].{}` is required.", index, key))
            })
        };
        let method: QmMethod = parse_name(&required(partial.method, "method")?)?;
        let basis: QmBasis = parse_name(&required(partial.basis, "basis")?)?;

        let mut builder = core_config::QmGroupConfigBuilder::new()
            .method(method)
            .basis(basis);
        if let Some(charge) = partial.charge {
            builder = builder.net_charge(charge);
        }
        if let Some(multiplicity) = partial.multiplicity {
            builder = builder.multiplicity(multiplicity);
        }
        if let Some(sh) = partial.surface_hopping {
            builder = builder.surface_hopping(Self::merge_surface_hopping(index, sh)?);
        }
        builder
            .build()
            .map_err(|e| CliError::Config(format!("group {}: {}", index, e)))
    }

    fn merge_surface_hopping(
        index: usize,
        p: PartialSurfaceHoppingConfig,
    ) -> Result<SurfaceHopping> {
        let missing = |key: &str| {
            CliError::Config(format!(
                "`groups[{}].surface-hopping` requires `{}`",
                index, key
            ))
        };
        Ok(SurfaceHopping {
            cas_orbitals: p.cas_orbitals.ok_or_else(|| missing("cas-orbitals"))?,
            cas_electrons: p.cas_electrons.ok_or_else(|| missing("cas-electrons"))?,
            sa_steps: p.sa_steps.unwrap_or(0),
            sa_on: p.sa_on.unwrap_or(1.0),
            sa_off: p.sa_off.unwrap_or(0.0),
            sa_step: p.sa_step.unwrap_or(0),
        })
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };

            match key {
                "scheme" => self.scheme = Some(value_str.to_string()),
                "scale-factor" => {
                    self.scale_factor = Some(value_str.parse().map_err(|_| {
                        CliError::Config(format!("Invalid float value for {}: {}", key, value_str))
                    })?);
                }
                "run.ranks" => {
                    self.run.get_or_insert_with(Default::default).ranks =
                        Some(value_str.parse().map_err(|_| {
                            CliError::Config(format!(
                                "Invalid integer value for {}: {}",
                                key, value_str
                            ))
                        })?);
                }
                "run.cutoff-scheme" => {
                    self.run.get_or_insert_with(Default::default).cutoff_scheme =
                        Some(value_str.to_string());
                }
                "run.integrator" => {
                    self.run.get_or_insert_with(Default::default).integrator =
                        Some(value_str.to_string());
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}
