use super::block_eigenspace::BlockEigenspace;
use super::config::FailurePolicy;
use super::error::EngineError;
use super::report::{DiagnosticReport, FailureStage};
use super::workspace::SortWorkspace;
use crate::core::linalg::eigen::SymmetricEigensolver;
use nalgebra::DMatrix;
use tracing::{error, info, instrument};

/// Eigenpairs of the inner matrix, ordered by ascending `|λ|` unless the
/// solve failed under best-effort mode.
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedSolution {
    pub values: Vec<f64>,
    pub vectors: DMatrix<f64>,
    pub sorted: bool,
}

#[instrument(skip_all, name = "reduced_solve", fields(size = inner.nrows()))]
pub fn solve_reduced<S: SymmetricEigensolver>(
    solver: &S,
    inner: &DMatrix<f64>,
    policy: FailurePolicy,
    workspace: &mut SortWorkspace,
    report: &mut DiagnosticReport,
) -> Result<ReducedSolution, EngineError> {
    match solver.decompose(inner) {
        Ok(decomposition) => {
            let mut values = decomposition.values;
            let mut vectors = decomposition.vectors;
            workspace.sort(&mut values, &mut vectors)?;
            info!(
                size = values.len(),
                softest = values.first().copied(),
                "Reduced problem solved."
            );
            Ok(ReducedSolution {
                values,
                vectors,
                sorted: true,
            })
        }
        Err(source) => match policy {
            FailurePolicy::Strict => Err(EngineError::ReducedDiagonalization { source }),
            FailurePolicy::BestEffort => {
                error!("Reduced diagonalization failed: {source}");
                report.record(FailureStage::Reduced, source);
                let size = inner.nrows();
                Ok(ReducedSolution {
                    values: inner.diagonal().iter().copied().collect(),
                    vectors: DMatrix::identity(size, size),
                    sorted: false,
                })
            }
        },
    }
}

/// Expands reduced eigenvectors into the caller's `3N`-row output buffer.
///
/// Each block writes its rows as `Qᵢ · Vᵢ`, where `Vᵢ` are the rows of the
/// reduced eigenvectors belonging to that block's retained modes. Output
/// columns beyond the reduced size are zero-filled; reduced eigenvectors
/// beyond the output width are dropped.
pub fn expand_into(
    eigenspace: &BlockEigenspace,
    reduced: &DMatrix<f64>,
    output: &mut DMatrix<f64>,
) -> Result<(), EngineError> {
    if reduced.nrows() != eigenspace.retained_total {
        return Err(EngineError::DimensionMismatch {
            context: "reduced eigenvector matrix",
            expected: eigenspace.retained_total,
            found: reduced.nrows(),
        });
    }

    for set in &eigenspace.sets {
        set.vectors.product_to_array(reduced, output);
    }
    let filled = reduced.ncols().min(output.ncols());
    if filled < output.ncols() {
        let extra = output.ncols() - filled;
        output.columns_mut(filled, extra).fill(0.0);
    }
    Ok(())
}
