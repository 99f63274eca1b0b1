use super::geometric::{DEGENERATE_NORM_SQUARED, GeometricModes};
use nalgebra::{DMatrix, DVector};
use tracing::trace;

/// Geometric modes merged with the surviving numerical eigenvectors into one
/// orthonormal basis of the block's coordinate space.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedBasis {
    /// Square orthonormal matrix; the first `inserted` columns are geometric.
    pub vectors: DMatrix<f64>,
    pub inserted: usize,
    /// Positions (in the numerical input) of candidates discarded as redundant.
    pub rejected: Vec<usize>,
    /// Standard basis vectors appended when the candidates ran out.
    pub completed: usize,
}

/// Orthogonalizes `modes` against each other, then sifts the numerical
/// eigenvector columns through the resulting subspace.
///
/// A numerical candidate whose squared residual norm after projection falls
/// below `residual_threshold` is discarded as already represented by the
/// geometric modes; the next candidate takes its place. If the candidates run
/// out before the basis is complete, standard basis vectors fill the rest, so
/// the result is always square.
pub fn merge_with_numerical(
    modes: &GeometricModes,
    numerical: &DMatrix<f64>,
    residual_threshold: f64,
) -> MergedBasis {
    let dim = numerical.nrows();
    let mut basis: Vec<DVector<f64>> = Vec::with_capacity(dim);

    for column in modes.vectors.column_iter() {
        if basis.len() == dim {
            break;
        }
        let residual = project_out(column.into_owned(), &basis);
        let norm_squared = residual.norm_squared();
        if norm_squared > DEGENERATE_NORM_SQUARED {
            basis.push(residual / norm_squared.sqrt());
        }
    }
    let inserted = basis.len();

    let mut rejected = Vec::new();
    for (index, column) in numerical.column_iter().enumerate() {
        if basis.len() == dim {
            break;
        }
        let residual = project_out(column.into_owned(), &basis);
        let norm_squared = residual.norm_squared();
        if norm_squared < residual_threshold && inserted > 0 {
            trace!(
                candidate = index,
                norm_squared, "Residual vector norm is low, skipping."
            );
            rejected.push(index);
            continue;
        }
        if norm_squared > DEGENERATE_NORM_SQUARED {
            basis.push(residual / norm_squared.sqrt());
        }
    }

    let mut completed = 0;
    for axis in 0..dim {
        if basis.len() == dim {
            break;
        }
        let unit = DVector::from_fn(dim, |r, _| if r == axis { 1.0 } else { 0.0 });
        let residual = project_out(unit, &basis);
        let norm_squared = residual.norm_squared();
        if norm_squared > 1e-8 {
            basis.push(residual / norm_squared.sqrt());
            completed += 1;
        }
    }

    MergedBasis {
        vectors: DMatrix::from_fn(dim, basis.len(), |r, c| basis[c][r]),
        inserted,
        rejected,
        completed,
    }
}

/// Removes the components of `v` along every vector of the orthonormal `basis`.
///
/// Runs modified Gram–Schmidt twice, which keeps the result orthogonal to
/// working precision even when `v` is nearly inside the span.
fn project_out(mut v: DVector<f64>, basis: &[DVector<f64>]) -> DVector<f64> {
    for _ in 0..2 {
        for q in basis {
            let dot = q.dot(&v);
            v.axpy(-dot, q, 1.0);
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-10;

    fn assert_orthonormal(m: &DMatrix<f64>) {
        let gram = m.transpose() * m;
        let identity = DMatrix::<f64>::identity(m.ncols(), m.ncols());
        assert!((gram - identity).abs().max() < TOLERANCE);
    }

    fn modes_from(dim: usize, columns: &[DVector<f64>]) -> GeometricModes {
        GeometricModes {
            vectors: DMatrix::from_fn(dim, columns.len(), |r, c| columns[c][r]),
            rigid_count: columns.len(),
            hinge_count: 0,
        }
    }

    #[test]
    fn merged_basis_is_square_and_orthonormal() {
        let s = 1.0 / 2f64.sqrt();
        let modes = modes_from(3, &[DVector::from_vec(vec![s, s, 0.0])]);
        let numerical = DMatrix::identity(3, 3);
        let merged = merge_with_numerical(&modes, &numerical, 0.05);

        assert_eq!(merged.vectors.shape(), (3, 3));
        assert_eq!(merged.inserted, 1);
        assert_orthonormal(&merged.vectors);
        assert!((merged.vectors[(0, 0)] - s).abs() < TOLERANCE);
    }

    #[test]
    fn candidate_inside_geometric_span_is_rejected() {
        let modes = modes_from(3, &[DVector::from_vec(vec![1.0, 0.0, 0.0])]);
        let numerical = DMatrix::identity(3, 3);
        let merged = merge_with_numerical(&modes, &numerical, 0.05);
        assert_eq!(merged.rejected, vec![0]);
        assert_eq!(merged.completed, 0);
        assert_orthonormal(&merged.vectors);
    }

    #[test]
    fn threshold_is_configurable() {
        // e1 + 0.3 e2 keeps a squared residual of ~0.083 against e1
        let modes = modes_from(3, &[DVector::from_vec(vec![1.0, 0.0, 0.0])]);
        let v = DVector::from_vec(vec![1.0, 0.3, 0.0]).normalize();
        let numerical = DMatrix::from_columns(&[
            v,
            DVector::from_vec(vec![0.0, 0.0, 1.0]),
            DVector::from_vec(vec![0.0, 1.0, 0.0]),
        ]);
        let lenient = merge_with_numerical(&modes, &numerical, 0.05);
        let strict = merge_with_numerical(&modes, &numerical, 0.1);
        assert!(lenient.rejected.is_empty());
        assert_eq!(strict.rejected, vec![0]);
        assert_orthonormal(&strict.vectors);
    }

    #[test]
    fn dependent_geometric_modes_are_collapsed() {
        let e1 = DVector::from_vec(vec![1.0, 0.0]);
        let modes = modes_from(2, &[e1.clone(), e1]);
        let merged = merge_with_numerical(&modes, &DMatrix::identity(2, 2), 0.05);
        assert_eq!(merged.inserted, 1);
        assert_eq!(merged.vectors.ncols(), 2);
    }

    #[test]
    fn exhausted_candidates_are_completed_with_standard_basis() {
        let modes = modes_from(3, &[DVector::from_vec(vec![1.0, 0.0, 0.0])]);
        let numerical = DMatrix::from_column_slice(3, 1, &[0.0, 1.0, 0.0]);
        let merged = merge_with_numerical(&modes, &numerical, 0.05);
        assert_eq!(merged.completed, 1);
        assert_orthonormal(&merged.vectors);
    }

    #[test]
    fn without_geometric_modes_nothing_is_rejected() {
        let modes = modes_from(2, &[]);
        let numerical = DMatrix::identity(2, 2) * 0.1;
        let merged = merge_with_numerical(&modes, &numerical, 0.05);
        assert!(merged.rejected.is_empty());
        assert_orthonormal(&merged.vectors);
    }
}
