use super::coupling::{CouplingGraph, CouplingKind};
use super::forces::ForceError;
use crate::core::linalg::block_matrix::BlockMatrix;
use crate::core::models::block::{BlockLayout, LayoutError};
use crate::core::models::system::Topology;
use itertools::Itertools;
use nalgebra::Point3;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum HessianError {
    #[error("Invalid block layout: {0}")]
    Layout(#[from] LayoutError),
    #[error("Block index {block} out of range ({count} blocks)")]
    BlockOutOfRange { block: usize, count: usize },
    #[error(
        "Tile for {context} has shape {rows}x{columns} at ({row_start}, {column_start}), expected {expected_rows}x{expected_columns} at ({expected_row_start}, {expected_column_start})"
    )]
    TileShape {
        context: String,
        rows: usize,
        columns: usize,
        row_start: usize,
        column_start: usize,
        expected_rows: usize,
        expected_columns: usize,
        expected_row_start: usize,
        expected_column_start: usize,
    },
    #[error("{kind} coupling between blocks {from} and {to} is given more than once")]
    DuplicateCoupling {
        kind: CouplingKind,
        from: usize,
        to: usize,
    },
    #[error("Expected {expected} positions, found {found}")]
    PositionCount { expected: usize, found: usize },
    #[error("Force evaluation error: {0}")]
    Forces(#[from] ForceError),
}

/// The block Hessian collaborator.
///
/// Owns per-block dense Hessian tiles and the inter-block coupling graph. The
/// engine asks it to refresh block tiles at the current positions before
/// diagonalizing them, and to rebuild the coupling within a cutoff distance
/// before assembling the inner matrix. How tiles are computed is entirely up
/// to the implementation.
pub trait BlockHessianSource {
    fn layout(&self) -> &BlockLayout;

    /// Refreshes per-block tiles. `numerical` selects finite-difference tiles
    /// over analytic ones where an implementation supports both.
    fn evaluate_blocks(
        &mut self,
        positions: &[Point3<f64>],
        topology: &Topology,
        numerical: bool,
    ) -> Result<(), HessianError>;

    fn block_tile(&self, block: usize) -> Option<&BlockMatrix>;

    /// Clears and rebuilds the coupling graph for blocks within `cutoff`.
    fn evaluate_coupling(
        &mut self,
        cutoff: f64,
        positions: &[Point3<f64>],
        topology: &Topology,
    ) -> Result<(), HessianError>;

    fn coupling(&self) -> &CouplingGraph;
}

/// A block Hessian whose tiles were assembled ahead of time.
///
/// Evaluation requests are no-ops: tiles and coupling stay exactly as supplied.
/// Same-block coupling edges default to the block tiles when not given.
#[derive(Debug, Clone, PartialEq)]
pub struct PrecomputedBlockHessian {
    layout: BlockLayout,
    tiles: Vec<BlockMatrix>,
    coupling: CouplingGraph,
}

impl PrecomputedBlockHessian {
    pub fn new(
        layout: BlockLayout,
        tiles: Vec<BlockMatrix>,
        mut coupling: CouplingGraph,
    ) -> Result<Self, HessianError> {
        if tiles.len() != layout.len() {
            return Err(HessianError::BlockOutOfRange {
                block: tiles.len(),
                count: layout.len(),
            });
        }
        for (index, (block, tile)) in layout.blocks().iter().zip(&tiles).enumerate() {
            check_tile(
                &format!("block {index}"),
                tile,
                block.coordinate_start(),
                block.coordinate_start(),
                block.dimension(),
                block.dimension(),
            )?;
        }
        for edge in coupling.edges() {
            let count = layout.len();
            let from = layout
                .block(edge.from)
                .ok_or(HessianError::BlockOutOfRange {
                    block: edge.from,
                    count,
                })?;
            let to = layout.block(edge.to).ok_or(HessianError::BlockOutOfRange {
                block: edge.to,
                count,
            })?;
            check_tile(
                &format!("{} coupling {}-{}", edge.kind, edge.from, edge.to),
                &edge.tile,
                from.coordinate_start(),
                to.coordinate_start(),
                from.dimension(),
                to.dimension(),
            )?;
        }
        // edges are stored upper-triangular, so (1, 0) and (0, 1) share a key
        if let Some(edge) = coupling
            .edges()
            .iter()
            .duplicates_by(|e| (e.kind, e.from, e.to))
            .next()
        {
            return Err(HessianError::DuplicateCoupling {
                kind: edge.kind,
                from: edge.from,
                to: edge.to,
            });
        }
        if let Some(tile) = coupling.electrostatics() {
            let n = layout.dimension();
            check_tile("electrostatics", tile, 0, 0, n, n)?;
        }

        let missing: Vec<usize> = (0..layout.len())
            .filter(|&b| {
                !coupling
                    .edges_of_kind(CouplingKind::SameBlock)
                    .any(|e| e.from == b)
            })
            .collect();
        for block in missing {
            coupling.add_edge(block, block, CouplingKind::SameBlock, tiles[block].clone());
        }

        Ok(Self {
            layout,
            tiles,
            coupling,
        })
    }

    /// Block-diagonal Hessian with no inter-block coupling.
    pub fn block_diagonal(layout: BlockLayout, tiles: Vec<BlockMatrix>) -> Result<Self, HessianError> {
        let coupling = CouplingGraph::new(layout.len());
        Self::new(layout, tiles, coupling)
    }

    pub fn tiles(&self) -> &[BlockMatrix] {
        &self.tiles
    }
}

fn check_tile(
    context: &str,
    tile: &BlockMatrix,
    expected_row_start: usize,
    expected_column_start: usize,
    expected_rows: usize,
    expected_columns: usize,
) -> Result<(), HessianError> {
    if tile.row_start() != expected_row_start
        || tile.column_start() != expected_column_start
        || tile.rows() != expected_rows
        || tile.columns() != expected_columns
    {
        return Err(HessianError::TileShape {
            context: context.to_string(),
            rows: tile.rows(),
            columns: tile.columns(),
            row_start: tile.row_start(),
            column_start: tile.column_start(),
            expected_rows,
            expected_columns,
            expected_row_start,
            expected_column_start,
        });
    }
    Ok(())
}

impl BlockHessianSource for PrecomputedBlockHessian {
    fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    fn evaluate_blocks(
        &mut self,
        positions: &[Point3<f64>],
        _topology: &Topology,
        _numerical: bool,
    ) -> Result<(), HessianError> {
        ensure_position_count(&self.layout, positions)
    }

    fn block_tile(&self, block: usize) -> Option<&BlockMatrix> {
        self.tiles.get(block)
    }

    fn evaluate_coupling(
        &mut self,
        _cutoff: f64,
        positions: &[Point3<f64>],
        _topology: &Topology,
    ) -> Result<(), HessianError> {
        ensure_position_count(&self.layout, positions)
    }

    fn coupling(&self) -> &CouplingGraph {
        &self.coupling
    }
}

fn ensure_position_count(layout: &BlockLayout, positions: &[Point3<f64>]) -> Result<(), HessianError> {
    if positions.len() != layout.atom_count() {
        return Err(HessianError::PositionCount {
            expected: layout.atom_count(),
            found: positions.len(),
        });
    }
    Ok(())
}
