use nalgebra::DMatrix;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EigenError {
    #[error("Eigensolver failed to converge for a {dimension}x{dimension} matrix")]
    NoConvergence { dimension: usize },
    #[error("Matrix of dimension {dimension} contains non-finite entries")]
    NonFinite { dimension: usize },
    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
}

/// Full eigendecomposition of a dense symmetric matrix.
///
/// `vectors` holds one eigenvector per column, in the same order as `values`.
#[derive(Debug, Clone, PartialEq)]
pub struct EigenDecomposition {
    pub values: Vec<f64>,
    pub vectors: DMatrix<f64>,
}

impl EigenDecomposition {
    pub fn dimension(&self) -> usize {
        self.values.len()
    }
}

/// Boundary to a dense symmetric eigensolver.
///
/// Implementations return all eigenpairs of the given matrix. The engine makes
/// no assumption about the order in which eigenpairs are returned.
pub trait SymmetricEigensolver {
    /// Whether the backing numerical library can be used in this process.
    fn is_available(&self) -> bool {
        true
    }

    fn decompose(&self, matrix: &DMatrix<f64>) -> Result<EigenDecomposition, EigenError>;
}

/// Symmetric eigensolver backed by nalgebra's implicit QR iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NalgebraEigensolver {
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for NalgebraEigensolver {
    fn default() -> Self {
        Self {
            tolerance: f64::EPSILON,
            // zero means "iterate until convergence" for nalgebra
            max_iterations: 0,
        }
    }
}

impl SymmetricEigensolver for NalgebraEigensolver {
    fn decompose(&self, matrix: &DMatrix<f64>) -> Result<EigenDecomposition, EigenError> {
        let dimension = matrix.nrows();
        if matrix.ncols() != dimension {
            return Err(EigenError::DimensionMismatch {
                expected: dimension,
                found: matrix.ncols(),
            });
        }
        if dimension == 0 {
            return Ok(EigenDecomposition {
                values: Vec::new(),
                vectors: DMatrix::zeros(0, 0),
            });
        }
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(EigenError::NonFinite { dimension });
        }

        let eigen = matrix
            .clone()
            .try_symmetric_eigen(self.tolerance, self.max_iterations)
            .ok_or(EigenError::NoConvergence { dimension })?;

        Ok(EigenDecomposition {
            values: eigen.eigenvalues.iter().copied().collect(),
            vectors: eigen.eigenvectors,
        })
    }
}
