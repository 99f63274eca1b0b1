use super::eigen::EigenError;
use nalgebra::DMatrix;
use std::cmp::Ordering;

const VISITED: usize = usize::MAX;

/// Orders eigenpairs by ascending absolute eigenvalue.
///
/// `values[i]`, column `i` of `vectors` and `indices[i]` describe one eigenpair;
/// all three are permuted together so that `|values|` is non-decreasing. Ties
/// keep their current relative order, so already-sorted input is left untouched.
///
/// `order` is caller-provided scratch of the same length; it is overwritten.
/// The permutation is applied in place by following its cycles and swapping
/// whole columns, without building a permuted copy.
pub fn stable_abs_sort(
    values: &mut [f64],
    vectors: &mut DMatrix<f64>,
    indices: &mut [usize],
    order: &mut [usize],
) -> Result<(), EigenError> {
    let dim = values.len();
    for found in [vectors.ncols(), indices.len(), order.len()] {
        if found != dim {
            return Err(EigenError::DimensionMismatch {
                expected: dim,
                found,
            });
        }
    }

    for (i, slot) in order.iter_mut().enumerate() {
        *slot = i;
    }
    order.sort_by(|&a, &b| compare_abs(values[a], values[b]).then(a.cmp(&b)));

    // position i must receive the pair currently at order[i]
    for start in 0..dim {
        if order[start] == VISITED {
            continue;
        }
        let mut current = start;
        loop {
            let next = order[current];
            order[current] = VISITED;
            if next == start || next == current {
                break;
            }
            values.swap(current, next);
            indices.swap(current, next);
            vectors.swap_columns(current, next);
            current = next;
        }
    }

    Ok(())
}

/// Convenience wrapper that allocates its own scratch and resets `indices` to
/// the identity before sorting. Returns the original position of each pair.
pub fn abs_sort_eigenpairs(
    values: &mut [f64],
    vectors: &mut DMatrix<f64>,
) -> Result<Vec<usize>, EigenError> {
    let mut indices: Vec<usize> = (0..values.len()).collect();
    let mut order = vec![0; values.len()];
    stable_abs_sort(values, vectors, &mut indices, &mut order)?;
    Ok(indices)
}

fn compare_abs(a: f64, b: f64) -> Ordering {
    a.abs().total_cmp(&b.abs())
}
