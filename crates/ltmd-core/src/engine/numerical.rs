use super::block_eigenspace::BlockEigenspace;
use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use super::workspace::zeroed_matrix;
use crate::core::hessian::forces::{ForceError, ForceProvider};
use nalgebra::{DMatrix, DVector, Point3, Vector3};
use tracing::{info, instrument};

/// Projects a finite-difference Hessian onto the retained block eigenbasis.
///
/// Each of the `3N` coordinates is displaced by `±epsilon`; the resulting
/// central difference of the forces is one Hessian column `hᵢ`, which is
/// immediately folded into the inner matrix as `(Qᵀ hᵢ) ⊗ Qᵢ`. This costs
/// `6N` force evaluations and a dense `3N × Σ` copy of the basis. The caller's
/// positions are never modified.
#[instrument(skip_all, name = "inner_hessian_numerical", fields(epsilon))]
pub fn assemble_numerical_inner_hessian(
    forces: &mut dyn ForceProvider,
    positions: &[Point3<f64>],
    eigenspace: &BlockEigenspace,
    epsilon: f64,
    reporter: &ProgressReporter<'_>,
) -> Result<DMatrix<f64>, EngineError> {
    let dimension = 3 * positions.len();
    let size = eigenspace.retained_total;

    let mut basis = zeroed_matrix(dimension, size, "dense eigenvector basis")?;
    for set in &eigenspace.sets {
        let tile = &set.vectors;
        if tile.columns() == 0 {
            continue;
        }
        if tile.row_range().end > dimension || tile.column_range().end > size {
            return Err(EngineError::DimensionMismatch {
                context: "block eigenvector tile",
                expected: dimension,
                found: tile.row_range().end,
            });
        }
        basis
            .view_mut((tile.row_start(), tile.column_start()), (tile.rows(), tile.columns()))
            .copy_from(tile.data());
    }

    let mut inner = zeroed_matrix(size, size, "inner matrix")?;
    let mut working = positions.to_vec();

    reporter.report(Progress::TaskStart {
        total_steps: dimension as u64,
    });
    for coordinate in 0..dimension {
        let (atom, axis) = (coordinate / 3, coordinate % 3);
        let original = working[atom][axis];

        working[atom][axis] = original + epsilon;
        let plus_offset = working[atom][axis];
        let plus = evaluate(forces, &working)?;

        working[atom][axis] = original - epsilon;
        let minus_offset = working[atom][axis];
        let minus = evaluate(forces, &working)?;

        working[atom][axis] = original;

        let step = plus_offset - minus_offset;
        let column = DVector::from_fn(dimension, |row, _| {
            -(plus[row / 3][row % 3] - minus[row / 3][row % 3]) / step
        });

        let projected = basis.tr_mul(&column);
        inner.ger(1.0, &projected, &basis.row(coordinate).transpose(), 1.0);
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);

    let symmetric = (&inner + inner.transpose()) * 0.5;
    info!(
        size,
        force_evaluations = 2 * dimension,
        "Inner matrix assembled from finite differences."
    );
    Ok(symmetric)
}

fn evaluate(
    forces: &mut dyn ForceProvider,
    positions: &[Point3<f64>],
) -> Result<Vec<Vector3<f64>>, EngineError> {
    let result = forces.calculate_forces(positions)?;
    if result.len() != positions.len() {
        return Err(ForceError::WrongLength {
            expected: positions.len(),
            found: result.len(),
        }
        .into());
    }
    Ok(result)
}
