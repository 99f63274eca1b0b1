use super::diagnostics::DiagnosticKind;
use std::path::PathBuf;
use thiserror::Error;

/// Squared residual norm below which a numerical eigenvector is considered
/// already spanned by the geometric modes.
pub const DEFAULT_RESIDUAL_THRESHOLD: f64 = 0.05;
/// Coordinate displacement for central finite differences.
pub const DEFAULT_FINITE_DIFFERENCE_EPSILON: f64 = 1e-9;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// What the engine does when a dense eigensolve fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Abort the call with an error.
    #[default]
    Strict,
    /// Record the failure in the report, substitute a fallback and continue.
    BestEffort,
}

/// Which plain-text artifacts are written during `find_eigenvectors`, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticsConfig {
    pub directory: PathBuf,
    pub kinds: Vec<DiagnosticKind>,
}

impl DiagnosticsConfig {
    /// Every artifact, written into `directory`.
    pub fn all(directory: PathBuf) -> Self {
        Self {
            directory,
            kinds: vec![
                DiagnosticKind::InnerMatrix,
                DiagnosticKind::Eigenvalues,
                DiagnosticKind::BlockHessian,
            ],
        }
    }

    pub fn includes(&self, kind: DiagnosticKind) -> bool {
        self.kinds.contains(&kind)
    }
}

/// Policy parameters of one diagonalization call.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagonalizationConfig {
    /// Block modes with `|λ|` at or above this value are truncated.
    pub eigenvalue_threshold: f64,
    /// Distance within which inter-block coupling is evaluated.
    pub block_cutoff: f64,
    /// Average number of retained columns per block. When set, replaces the
    /// threshold with a global cutoff that retains exactly
    /// `blocks × columns_per_block` modes.
    pub columns_per_block: Option<usize>,
    pub geometric_modes: bool,
    pub numerical_hessian: bool,
    pub residual_threshold: f64,
    pub finite_difference_epsilon: f64,
    pub failure_policy: FailurePolicy,
    pub diagnostics: Option<DiagnosticsConfig>,
}

#[derive(Default)]
pub struct DiagonalizationConfigBuilder {
    eigenvalue_threshold: Option<f64>,
    block_cutoff: Option<f64>,
    columns_per_block: Option<usize>,
    geometric_modes: Option<bool>,
    numerical_hessian: Option<bool>,
    residual_threshold: Option<f64>,
    finite_difference_epsilon: Option<f64>,
    failure_policy: Option<FailurePolicy>,
    diagnostics: Option<DiagnosticsConfig>,
}

impl DiagonalizationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eigenvalue_threshold(mut self, threshold: f64) -> Self {
        self.eigenvalue_threshold = Some(threshold);
        self
    }
    pub fn block_cutoff(mut self, cutoff: f64) -> Self {
        self.block_cutoff = Some(cutoff);
        self
    }
    pub fn columns_per_block(mut self, columns: Option<usize>) -> Self {
        self.columns_per_block = columns;
        self
    }
    pub fn geometric_modes(mut self, enabled: bool) -> Self {
        self.geometric_modes = Some(enabled);
        self
    }
    pub fn numerical_hessian(mut self, enabled: bool) -> Self {
        self.numerical_hessian = Some(enabled);
        self
    }
    pub fn residual_threshold(mut self, threshold: f64) -> Self {
        self.residual_threshold = Some(threshold);
        self
    }
    pub fn finite_difference_epsilon(mut self, epsilon: f64) -> Self {
        self.finite_difference_epsilon = Some(epsilon);
        self
    }
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = Some(policy);
        self
    }
    pub fn diagnostics(mut self, diagnostics: Option<DiagnosticsConfig>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn build(self) -> Result<DiagonalizationConfig, ConfigError> {
        let config = DiagonalizationConfig {
            eigenvalue_threshold: self
                .eigenvalue_threshold
                .ok_or(ConfigError::MissingParameter("eigenvalue_threshold"))?,
            block_cutoff: self
                .block_cutoff
                .ok_or(ConfigError::MissingParameter("block_cutoff"))?,
            columns_per_block: self.columns_per_block,
            geometric_modes: self.geometric_modes.unwrap_or(false),
            numerical_hessian: self.numerical_hessian.unwrap_or(false),
            residual_threshold: self
                .residual_threshold
                .unwrap_or(DEFAULT_RESIDUAL_THRESHOLD),
            finite_difference_epsilon: self
                .finite_difference_epsilon
                .unwrap_or(DEFAULT_FINITE_DIFFERENCE_EPSILON),
            failure_policy: self.failure_policy.unwrap_or_default(),
            diagnostics: self.diagnostics,
        };
        config.validate()?;
        Ok(config)
    }
}

impl DiagonalizationConfig {
    /// Checks parameter ranges. The engine calls this on every request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.eigenvalue_threshold.is_finite() || self.eigenvalue_threshold <= 0.0 {
            return Err(invalid("eigenvalue_threshold", "must be positive and finite"));
        }
        if !self.block_cutoff.is_finite() || self.block_cutoff < 0.0 {
            return Err(invalid("block_cutoff", "must be non-negative and finite"));
        }
        if self.columns_per_block == Some(0) {
            return Err(invalid("columns_per_block", "must be at least 1"));
        }
        if !(0.0..1.0).contains(&self.residual_threshold) {
            return Err(invalid("residual_threshold", "must lie in [0, 1)"));
        }
        if !self.finite_difference_epsilon.is_finite() || self.finite_difference_epsilon <= 0.0 {
            return Err(invalid(
                "finite_difference_epsilon",
                "must be positive and finite",
            ));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidParameter {
        name,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_applies_defaults_for_optional_fields() {
        let config = DiagonalizationConfigBuilder::new()
            .eigenvalue_threshold(3.0)
            .block_cutoff(10.0)
            .build()
            .unwrap();
        assert_eq!(config.columns_per_block, None);
        assert!(!config.geometric_modes);
        assert!(!config.numerical_hessian);
        assert_eq!(config.residual_threshold, DEFAULT_RESIDUAL_THRESHOLD);
        assert_eq!(config.finite_difference_epsilon, DEFAULT_FINITE_DIFFERENCE_EPSILON);
        assert_eq!(config.failure_policy, FailurePolicy::Strict);
        assert!(config.diagnostics.is_none());
    }

    #[test]
    fn build_fails_without_threshold() {
        let result = DiagonalizationConfigBuilder::new().block_cutoff(10.0).build();
        assert_eq!(
            result,
            Err(ConfigError::MissingParameter("eigenvalue_threshold"))
        );
    }

    #[test]
    fn build_fails_without_cutoff() {
        let result = DiagonalizationConfigBuilder::new()
            .eigenvalue_threshold(1.0)
            .build();
        assert_eq!(result, Err(ConfigError::MissingParameter("block_cutoff")));
    }

    #[test]
    fn build_rejects_zero_column_target() {
        let result = DiagonalizationConfigBuilder::new()
            .eigenvalue_threshold(1.0)
            .block_cutoff(10.0)
            .columns_per_block(Some(0))
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter {
                name: "columns_per_block",
                ..
            })
        ));
    }

    #[test]
    fn build_rejects_out_of_range_residual_threshold() {
        let result = DiagonalizationConfigBuilder::new()
            .eigenvalue_threshold(1.0)
            .block_cutoff(10.0)
            .residual_threshold(1.5)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter {
                name: "residual_threshold",
                ..
            })
        ));
    }

    #[test]
    fn validate_catches_fields_edited_after_build() {
        let mut config = DiagonalizationConfigBuilder::new()
            .eigenvalue_threshold(1.0)
            .block_cutoff(10.0)
            .build()
            .unwrap();
        assert!(config.validate().is_ok());
        config.eigenvalue_threshold = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter {
                name: "eigenvalue_threshold",
                ..
            })
        ));
    }

    #[test]
    fn diagnostics_all_includes_every_kind() {
        let diagnostics = DiagnosticsConfig::all(PathBuf::from("out"));
        assert!(diagnostics.includes(DiagnosticKind::BlockHessian));
        assert!(diagnostics.includes(DiagnosticKind::InnerMatrix));
        assert!(diagnostics.includes(DiagnosticKind::Eigenvalues));
    }
}
