use super::error::EngineError;
use crate::core::linalg::scratch::ScratchBuffer;
use crate::core::linalg::sort::stable_abs_sort;
use nalgebra::DMatrix;

/// Index and permutation arrays reused by every eigenpair sort of an engine.
///
/// Sized per session: a block, or the reduced problem. Storage only grows.
#[derive(Debug, Clone, Default)]
pub struct SortWorkspace {
    indices: ScratchBuffer<usize>,
    order: ScratchBuffer<usize>,
}

impl SortWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-sizes both arrays for sessions of up to `len` eigenpairs.
    pub fn reserve(&mut self, len: usize) -> Result<(), EngineError> {
        self.prepare(len)
    }

    /// Sorts the eigenpairs by ascending `|value|` and returns, for each new
    /// position, the pair's position before sorting.
    pub fn sort(
        &mut self,
        values: &mut [f64],
        vectors: &mut DMatrix<f64>,
    ) -> Result<&[usize], EngineError> {
        self.prepare(values.len())?;
        let indices = self.indices.as_mut_slice();
        for (i, slot) in indices.iter_mut().enumerate() {
            *slot = i;
        }
        stable_abs_sort(values, vectors, indices, self.order.as_mut_slice())?;
        Ok(self.indices.as_slice())
    }

    /// Elements currently held by the scratch arrays.
    pub fn capacity(&self) -> usize {
        self.indices.capacity() + self.order.capacity()
    }

    fn prepare(&mut self, len: usize) -> Result<(), EngineError> {
        let allocation = |_| EngineError::Allocation {
            what: "eigenpair scratch arrays",
            elements: len,
        };
        self.indices.prepare(len).map_err(allocation)?;
        self.order.prepare(len).map_err(allocation)?;
        Ok(())
    }
}

/// Allocates a zero-filled dense matrix, reporting allocation failure
/// instead of aborting.
pub fn zeroed_matrix(
    rows: usize,
    columns: usize,
    what: &'static str,
) -> Result<DMatrix<f64>, EngineError> {
    let elements = rows.saturating_mul(columns);
    let failure = || EngineError::Allocation { what, elements };
    if rows.checked_mul(columns).is_none() {
        return Err(failure());
    }
    let mut storage = Vec::new();
    storage.try_reserve_exact(elements).map_err(|_| failure())?;
    storage.resize(elements, 0.0);
    Ok(DMatrix::from_vec(rows, columns, storage))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_reports_original_positions() {
        let mut workspace = SortWorkspace::new();
        let mut values = vec![3.0, -1.0, 2.0];
        let mut vectors = DMatrix::identity(3, 3);
        let origin = workspace.sort(&mut values, &mut vectors).unwrap().to_vec();
        assert_eq!(values, vec![-1.0, 2.0, 3.0]);
        assert_eq!(origin, vec![1, 2, 0]);
        assert_eq!(vectors[(1, 0)], 1.0);
    }

    #[test]
    fn zeroed_matrix_reports_impossible_sizes() {
        let m = zeroed_matrix(2, 3, "test").unwrap();
        assert_eq!(m, DMatrix::<f64>::zeros(2, 3));
        assert!(matches!(
            zeroed_matrix(usize::MAX, 2, "test"),
            Err(EngineError::Allocation { what: "test", .. })
        ));
    }

    #[test]
    fn workspace_is_reused_across_session_sizes() {
        let mut workspace = SortWorkspace::new();
        workspace.reserve(12).unwrap();
        let capacity = workspace.capacity();

        let mut values = vec![1.0; 4];
        let mut vectors = DMatrix::identity(4, 4);
        workspace.sort(&mut values, &mut vectors).unwrap();
        assert_eq!(workspace.capacity(), capacity);
    }
}
