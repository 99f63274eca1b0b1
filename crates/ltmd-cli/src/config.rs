use crate::cli::DiagonalizeArgs;
use crate::error::{CliError, Result};
use ltmd::engine::config as core_config;
use ltmd::engine::diagnostics::DiagnosticKind;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_BLOCK_CUTOFF: f64 = 10.0;

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
enum PartialFailurePolicy {
    Strict,
    BestEffort,
}

impl From<PartialFailurePolicy> for core_config::FailurePolicy {
    fn from(p: PartialFailurePolicy) -> Self {
        match p {
            PartialFailurePolicy::Strict => core_config::FailurePolicy::Strict,
            PartialFailurePolicy::BestEffort => core_config::FailurePolicy::BestEffort,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialTruncationConfig {
    eigenvalue_threshold: Option<f64>,
    columns_per_block: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialCouplingConfig {
    block_cutoff: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialModesConfig {
    geometric: Option<bool>,
    residual_threshold: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialDiagnosticsConfig {
    directory: Option<PathBuf>,
    /// Artifact selectors: 0 = inner matrix, 1 = eigenvalues, 2 = block Hessian.
    kinds: Option<Vec<u32>>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialDiagonalizationConfig {
    truncation: Option<PartialTruncationConfig>,
    coupling: Option<PartialCouplingConfig>,
    modes: Option<PartialModesConfig>,
    failure_policy: Option<PartialFailurePolicy>,
    diagnostics: Option<PartialDiagnosticsConfig>,
}

impl PartialDiagonalizationConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn merge_with_cli(
        mut self,
        args: &DiagonalizeArgs,
    ) -> Result<core_config::DiagonalizationConfig> {
        let truncation = self.truncation.take().unwrap_or_default();
        let coupling = self.coupling.take().unwrap_or_default();
        let modes = self.modes.take().unwrap_or_default();

        let columns_per_block = args.columns.or(truncation.columns_per_block);
        let eigenvalue_threshold = match args.threshold.or(truncation.eigenvalue_threshold) {
            Some(threshold) => threshold,
            None if columns_per_block.is_some() => f64::MAX,
            None => {
                return Err(CliError::Config(
                    "`truncation.eigenvalue-threshold` is required unless `columns-per-block` is set."
                        .to_string(),
                ));
            }
        };

        let failure_policy = if args.best_effort {
            core_config::FailurePolicy::BestEffort
        } else {
            self.failure_policy.map(Into::into).unwrap_or_default()
        };

        let diagnostics = Self::merge_diagnostics(args.diagnostics_dir.clone(), self.diagnostics)?;

        core_config::DiagonalizationConfigBuilder::new()
            .eigenvalue_threshold(eigenvalue_threshold)
            .columns_per_block(columns_per_block)
            .block_cutoff(
                args.cutoff
                    .or(coupling.block_cutoff)
                    .unwrap_or(DEFAULT_BLOCK_CUTOFF),
            )
            .geometric_modes(args.geometric || modes.geometric.unwrap_or(false))
            .residual_threshold(
                modes
                    .residual_threshold
                    .unwrap_or(core_config::DEFAULT_RESIDUAL_THRESHOLD),
            )
            .failure_policy(failure_policy)
            .diagnostics(diagnostics)
            .build()
            .map_err(|e| CliError::Config(e.to_string()))
    }

    fn merge_diagnostics(
        cli_directory: Option<PathBuf>,
        partial: Option<PartialDiagnosticsConfig>,
    ) -> Result<Option<core_config::DiagnosticsConfig>> {
        if let Some(directory) = cli_directory {
            return Ok(Some(core_config::DiagnosticsConfig::all(directory)));
        }
        let Some(partial) = partial else {
            return Ok(None);
        };
        let directory = partial.directory.ok_or_else(|| {
            CliError::Config("`diagnostics` requires `directory`".to_string())
        })?;
        let Some(codes) = partial.kinds else {
            return Ok(Some(core_config::DiagnosticsConfig::all(directory)));
        };
        let kinds = codes
            .into_iter()
            .map(|code| {
                DiagnosticKind::from_code(code).ok_or_else(|| {
                    CliError::Config(format!(
                        "Unknown diagnostic selector {} (expected 0, 1 or 2)",
                        code
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(core_config::DiagnosticsConfig { directory, kinds }))
    }
}
