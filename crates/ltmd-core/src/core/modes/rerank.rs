use super::orthogonalize::MergedBasis;
use crate::core::linalg::eigen::EigenError;
use crate::core::linalg::sort::abs_sort_eigenpairs;
use nalgebra::DMatrix;

/// A merged basis whose columns carry Rayleigh-quotient estimates of the block
/// Hessian's eigenvalues and are ordered by ascending `|estimate|`.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedBasis {
    pub vectors: DMatrix<f64>,
    pub values: Vec<f64>,
    /// For each column, its position in the merged basis before sorting.
    pub origin: Vec<usize>,
}

/// Estimates `vᵀHv / vᵀv` for every column of the merged basis and sorts the
/// columns by the absolute value of that estimate.
pub fn rerank(merged: MergedBasis, hessian: &DMatrix<f64>) -> Result<RankedBasis, EigenError> {
    let mut vectors = merged.vectors;
    if hessian.nrows() != vectors.nrows() || hessian.ncols() != vectors.nrows() {
        return Err(EigenError::DimensionMismatch {
            expected: vectors.nrows(),
            found: hessian.nrows(),
        });
    }

    let projected = hessian * &vectors;
    let mut values: Vec<f64> = vectors
        .column_iter()
        .zip(projected.column_iter())
        .map(|(v, hv)| {
            let norm_squared = v.norm_squared();
            if norm_squared > 0.0 {
                v.dot(&hv) / norm_squared
            } else {
                0.0
            }
        })
        .collect();

    let origin = abs_sort_eigenpairs(&mut values, &mut vectors)?;
    Ok(RankedBasis {
        vectors,
        values,
        origin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn merged(vectors: DMatrix<f64>) -> MergedBasis {
        MergedBasis {
            vectors,
            inserted: 0,
            rejected: Vec::new(),
            completed: 0,
        }
    }

    #[test]
    fn quotients_of_eigenvectors_are_eigenvalues() {
        let hessian = DMatrix::from_diagonal(&nalgebra::DVector::from_vec(vec![5.0, -1.0, 3.0]));
        let ranked = rerank(merged(DMatrix::identity(3, 3)), &hessian).unwrap();
        assert_eq!(ranked.values, vec![-1.0, 3.0, 5.0]);
        assert_eq!(ranked.origin, vec![1, 2, 0]);
        assert_eq!(ranked.vectors[(1, 0)], 1.0);
    }

    #[test]
    fn mixed_vector_gets_weighted_average() {
        let hessian = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 4.0]);
        let s = 1.0 / 2f64.sqrt();
        let basis = DMatrix::from_row_slice(2, 2, &[s, s, s, -s]);
        let ranked = rerank(merged(basis), &hessian).unwrap();
        assert!((ranked.values[0] - 3.0).abs() < TOLERANCE);
        assert!((ranked.values[1] - 3.0).abs() < TOLERANCE);
        // equal quotients keep their merged order
        assert_eq!(ranked.origin, vec![0, 1]);
    }

    #[test]
    fn mismatched_hessian_is_rejected() {
        let err = rerank(merged(DMatrix::identity(3, 3)), &DMatrix::identity(2, 2)).unwrap_err();
        assert_eq!(
            err,
            EigenError::DimensionMismatch {
                expected: 3,
                found: 2
            }
        );
    }
}
