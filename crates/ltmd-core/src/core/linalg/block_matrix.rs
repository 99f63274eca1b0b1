use nalgebra::DMatrix;
use std::ops::{Index, IndexMut, Range};

/// A dense tile of a larger block-structured matrix.
///
/// The tile owns its storage and is addressed in the coordinates of the
/// enclosing matrix: element `(i, j)` of the tile lives at global position
/// `(row_start + i, column_start + j)`. All products below work on global
/// coordinates and only combine the overlapping index ranges of their operands,
/// so tiles taken from different places of the same matrix compose directly.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockMatrix {
    row_start: usize,
    column_start: usize,
    data: DMatrix<f64>,
}

fn overlap(a: &Range<usize>, b: &Range<usize>) -> Range<usize> {
    let start = a.start.max(b.start);
    let end = a.end.min(b.end);
    start..end.max(start)
}

impl BlockMatrix {
    /// Creates a zero-filled tile of `rows × columns` anchored at
    /// `(row_start, column_start)`.
    pub fn new(row_start: usize, column_start: usize, rows: usize, columns: usize) -> Self {
        Self {
            row_start,
            column_start,
            data: DMatrix::zeros(rows, columns),
        }
    }

    /// Wraps an existing dense matrix as a tile anchored at `(row_start, column_start)`.
    pub fn from_matrix(row_start: usize, column_start: usize, data: DMatrix<f64>) -> Self {
        Self {
            row_start,
            column_start,
            data,
        }
    }

    pub fn identity(row_start: usize, column_start: usize, dimension: usize) -> Self {
        Self::from_matrix(row_start, column_start, DMatrix::identity(dimension, dimension))
    }

    pub fn row_start(&self) -> usize {
        self.row_start
    }

    pub fn column_start(&self) -> usize {
        self.column_start
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn columns(&self) -> usize {
        self.data.ncols()
    }

    pub fn row_range(&self) -> Range<usize> {
        self.row_start..self.row_start + self.rows()
    }

    pub fn column_range(&self) -> Range<usize> {
        self.column_start..self.column_start + self.columns()
    }

    pub fn is_square(&self) -> bool {
        self.rows() == self.columns()
    }

    /// Local (tile-relative) dense storage.
    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut DMatrix<f64> {
        &mut self.data
    }

    pub fn into_inner(self) -> DMatrix<f64> {
        self.data
    }

    /// Returns the element at global position `(row, column)`, or `None` when the
    /// position lies outside the tile.
    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        if self.row_range().contains(&row) && self.column_range().contains(&column) {
            Some(self.data[(row - self.row_start, column - self.column_start)])
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    /// Re-anchors the tile without touching its contents.
    pub fn block_move(&mut self, row_start: usize, column_start: usize) {
        self.row_start = row_start;
        self.column_start = column_start;
    }

    /// Changes the number of columns, keeping the leading columns and
    /// zero-filling any new ones.
    pub fn column_resize(&mut self, columns: usize) {
        let rows = self.rows();
        let data = std::mem::replace(&mut self.data, DMatrix::zeros(0, 0));
        self.data = data.resize(rows, columns, 0.0);
    }

    /// Computes `selfᵀ · other` over the shared row range.
    ///
    /// The result is indexed by this tile's columns (rows) and `other`'s columns.
    pub fn transpose_product(&self, other: &BlockMatrix) -> BlockMatrix {
        let shared = overlap(&self.row_range(), &other.row_range());
        let mut result = BlockMatrix::new(
            self.column_start,
            other.column_start,
            self.columns(),
            other.columns(),
        );
        if !shared.is_empty() {
            let len = shared.len();
            let lhs = self
                .data
                .view((shared.start - self.row_start, 0), (len, self.columns()));
            let rhs = other
                .data
                .view((shared.start - other.row_start, 0), (len, other.columns()));
            result.data = lhs.tr_mul(&rhs);
        }
        result
    }

    /// Computes `self · other` over the shared inner range (this tile's columns
    /// against `other`'s rows).
    pub fn product(&self, other: &BlockMatrix) -> BlockMatrix {
        let mut result = BlockMatrix::new(
            self.row_start,
            other.column_start,
            self.rows(),
            other.columns(),
        );
        self.sum_product(other, &mut result);
        result
    }

    /// Accumulates `self · other` into `target` at the global positions the
    /// product covers. Positions outside `target` are ignored.
    pub fn sum_product(&self, other: &BlockMatrix, target: &mut BlockMatrix) {
        let inner = overlap(&self.column_range(), &other.row_range());
        if inner.is_empty() {
            return;
        }
        let rows = overlap(&self.row_range(), &target.row_range());
        let columns = overlap(&other.column_range(), &target.column_range());
        if rows.is_empty() || columns.is_empty() {
            return;
        }

        let lhs = self.data.view(
            (rows.start - self.row_start, inner.start - self.column_start),
            (rows.len(), inner.len()),
        );
        let rhs = other.data.view(
            (inner.start - other.row_start, columns.start - other.column_start),
            (inner.len(), columns.len()),
        );
        let mut out = target.data.view_mut(
            (rows.start - target.row_start, columns.start - target.column_start),
            (rows.len(), columns.len()),
        );
        out.gemm(1.0, &lhs, &rhs, 1.0);
    }

    /// Adds `other` into this tile over their overlapping region.
    pub fn accumulate(&mut self, other: &BlockMatrix) {
        let rows = overlap(&self.row_range(), &other.row_range());
        let columns = overlap(&self.column_range(), &other.column_range());
        if rows.is_empty() || columns.is_empty() {
            return;
        }
        let source = other.data.view(
            (rows.start - other.row_start, columns.start - other.column_start),
            (rows.len(), columns.len()),
        );
        let mut dest = self.data.view_mut(
            (rows.start - self.row_start, columns.start - self.column_start),
            (rows.len(), columns.len()),
        );
        dest += &source;
    }

    /// Expands reduced-space vectors into a full-space output buffer.
    ///
    /// For every output column `c`, writes
    /// `output[row, c] = Σ_k self[row, k] · reduced[k, c]` for the rows this
    /// tile covers, where `k` runs over this tile's (global) column range, i.e.
    /// the tile's slice of the reduced basis.
    pub fn product_to_array(&self, reduced: &DMatrix<f64>, output: &mut DMatrix<f64>) {
        let rows = overlap(&self.row_range(), &(0..output.nrows()));
        let inner = overlap(&self.column_range(), &(0..reduced.nrows()));
        let columns = output.ncols().min(reduced.ncols());
        if rows.is_empty() || columns == 0 {
            return;
        }

        let mut out = output.view_mut((rows.start, 0), (rows.len(), columns));
        if inner.is_empty() {
            out.fill(0.0);
            return;
        }
        let lhs = self.data.view(
            (rows.start - self.row_start, inner.start - self.column_start),
            (rows.len(), inner.len()),
        );
        let rhs = reduced.view((inner.start, 0), (inner.len(), columns));
        out.gemm(1.0, &lhs, &rhs, 0.0);
    }
}

impl Index<(usize, usize)> for BlockMatrix {
    type Output = f64;

    fn index(&self, (row, column): (usize, usize)) -> &f64 {
        &self.data[(row - self.row_start, column - self.column_start)]
    }
}

impl IndexMut<(usize, usize)> for BlockMatrix {
    fn index_mut(&mut self, (row, column): (usize, usize)) -> &mut f64 {
        &mut self.data[(row - self.row_start, column - self.column_start)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    #[test]
    fn global_indexing_is_offset_by_anchor() {
        let mut tile = BlockMatrix::new(3, 6, 2, 2);
        tile[(4, 7)] = 5.0;
        assert_eq!(tile.data()[(1, 1)], 5.0);
        assert_eq!(tile.get(4, 7), Some(5.0));
        assert_eq!(tile.get(0, 0), None);
    }

    #[test]
    fn column_resize_keeps_leading_columns_and_zero_fills() {
        let mut tile = BlockMatrix::from_matrix(0, 0, DMatrix::from_element(2, 2, 1.0));
        tile.column_resize(3);
        assert_eq!(tile.columns(), 3);
        assert_eq!(tile[(1, 1)], 1.0);
        assert_eq!(tile[(1, 2)], 0.0);
        tile.column_resize(1);
        assert_eq!(tile.columns(), 1);
        assert_eq!(tile[(0, 0)], 1.0);
    }

    #[test]
    fn transpose_product_uses_only_shared_rows() {
        let q = BlockMatrix::from_matrix(2, 0, DMatrix::from_row_slice(2, 1, &[1.0, 2.0]));
        let h = BlockMatrix::from_matrix(
            0,
            10,
            DMatrix::from_row_slice(4, 2, &[9.0, 9.0, 9.0, 9.0, 1.0, 0.0, 0.0, 1.0]),
        );
        let m = q.transpose_product(&h);
        assert_eq!(m.row_range(), 0..1);
        assert_eq!(m.column_range(), 10..12);
        assert!(f64_approx_equal(m[(0, 10)], 1.0));
        assert!(f64_approx_equal(m[(0, 11)], 2.0));
    }

    #[test]
    fn sum_product_accumulates_into_target_window() {
        let a = BlockMatrix::from_matrix(0, 4, DMatrix::from_row_slice(1, 2, &[1.0, 2.0]));
        let b = BlockMatrix::from_matrix(4, 1, DMatrix::from_row_slice(2, 1, &[3.0, 4.0]));
        let mut target = BlockMatrix::new(0, 0, 2, 2);
        target[(0, 1)] = 1.0;
        a.sum_product(&b, &mut target);
        assert!(f64_approx_equal(target[(0, 1)], 12.0));
        assert!(f64_approx_equal(target[(0, 0)], 0.0));
    }

    #[test]
    fn product_overwrites_fresh_result() {
        let a = BlockMatrix::from_matrix(0, 0, DMatrix::identity(2, 2) * 2.0);
        let b = BlockMatrix::from_matrix(0, 5, DMatrix::from_row_slice(2, 1, &[1.0, -1.0]));
        let c = a.product(&b);
        assert_eq!(c.column_start(), 5);
        assert!(f64_approx_equal(c[(0, 5)], 2.0));
        assert!(f64_approx_equal(c[(1, 5)], -2.0));
    }

    #[test]
    fn accumulate_adds_overlapping_region_only() {
        let mut full = BlockMatrix::new(0, 0, 4, 2);
        let tile = BlockMatrix::from_matrix(2, 1, DMatrix::from_element(2, 1, 3.0));
        full.accumulate(&tile);
        full.accumulate(&tile);
        assert!(f64_approx_equal(full[(3, 1)], 6.0));
        assert!(f64_approx_equal(full[(0, 1)], 0.0));
    }

    #[test]
    fn product_to_array_writes_block_rows() {
        let tile = BlockMatrix::from_matrix(2, 1, DMatrix::from_row_slice(2, 1, &[1.0, 2.0]));
        let reduced = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 5.0, 7.0]);
        let mut output = DMatrix::from_element(4, 2, -1.0);
        tile.product_to_array(&reduced, &mut output);
        assert!(f64_approx_equal(output[(2, 0)], 5.0));
        assert!(f64_approx_equal(output[(3, 1)], 14.0));
        assert!(f64_approx_equal(output[(0, 0)], -1.0));
    }
}
