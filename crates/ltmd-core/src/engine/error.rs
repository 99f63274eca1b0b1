use thiserror::Error;

use super::config::ConfigError;
use crate::core::hessian::forces::ForceError;
use crate::core::hessian::source::HessianError;
use crate::core::linalg::eigen::EigenError;
use crate::core::modes::geometric::GeometricModeError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("No compatible dense eigensolver is available")]
    SolverUnavailable,

    #[error("Failed to allocate {what} ({elements} elements)")]
    Allocation { what: &'static str, elements: usize },

    #[error("Operation requires an engine initialized in block mode")]
    NotBlockMode,

    #[error("Numerical Hessian requested but no force provider was supplied")]
    MissingForceProvider,

    #[error("Engine initialized for dimension {expected}, but {context} has dimension {found}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Diagonalization of block {block} failed: {source}")]
    BlockDiagonalization { block: usize, source: EigenError },

    #[error("Diagonalization of the reduced matrix failed: {source}")]
    ReducedDiagonalization { source: EigenError },

    #[error("Dense diagonalization failed: {source}")]
    DenseDiagonalization { source: EigenError },

    #[error("Geometric modes for block {block} could not be built: {source}")]
    GeometricModes {
        block: usize,
        source: GeometricModeError,
    },

    #[error("Block Hessian error: {source}")]
    Hessian {
        #[from]
        source: HessianError,
    },

    #[error("Force evaluation error: {source}")]
    Forces {
        #[from]
        source: ForceError,
    },

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Eigenpair ordering failed: {source}")]
    Ordering {
        #[from]
        source: EigenError,
    },
}
