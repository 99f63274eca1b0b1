use crate::core::linalg::block_matrix::BlockMatrix;
use serde::Deserialize;
use std::fmt;

/// Physical origin of a coupling tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CouplingKind {
    /// Interactions within one block.
    SameBlock,
    /// Bonded interactions between consecutive blocks.
    Adjacent,
    /// Bonded interactions between non-consecutive blocks (e.g. disulfides).
    DistantBonded,
    /// Non-bonded interactions between blocks within the cutoff distance.
    Nonbonded,
}

impl fmt::Display for CouplingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SameBlock => "same-block",
            Self::Adjacent => "adjacent",
            Self::DistantBonded => "distant-bonded",
            Self::Nonbonded => "nonbonded",
        };
        f.write_str(name)
    }
}

/// One edge of the block adjacency graph.
///
/// `tile` rows lie in block `from`'s coordinates and columns in block `to`'s.
/// For `from != to` only this triangle is stored; the transpose is implied.
#[derive(Debug, Clone, PartialEq)]
pub struct CouplingEdge {
    pub from: usize,
    pub to: usize,
    pub kind: CouplingKind,
    pub tile: BlockMatrix,
}

/// A single projected contribution to the inner matrix.
#[derive(Debug, Clone, Copy)]
pub struct Contribution<'a> {
    pub row_block: usize,
    pub column_block: usize,
    pub tile: &'a BlockMatrix,
    /// Whether the transpose must also be added at `(column_block, row_block)`.
    pub mirror: bool,
}

/// Sparse block-adjacency graph: nodes are blocks, edges carry a coupling tile
/// and its kind. An optional dense electrostatic Hessian spans all blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CouplingGraph {
    block_count: usize,
    edges: Vec<CouplingEdge>,
    electrostatics: Option<BlockMatrix>,
}

impl CouplingGraph {
    pub fn new(block_count: usize) -> Self {
        Self {
            block_count,
            edges: Vec::new(),
            electrostatics: None,
        }
    }

    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// Adds an edge, normalizing it to the upper triangle (`from <= to`).
    pub fn add_edge(&mut self, from: usize, to: usize, kind: CouplingKind, tile: BlockMatrix) {
        let edge = if from <= to {
            CouplingEdge {
                from,
                to,
                kind,
                tile,
            }
        } else {
            let transposed = BlockMatrix::from_matrix(
                tile.column_start(),
                tile.row_start(),
                tile.data().transpose(),
            );
            CouplingEdge {
                from: to,
                to: from,
                kind,
                tile: transposed,
            }
        };
        self.edges.push(edge);
    }

    pub fn set_electrostatics(&mut self, tile: Option<BlockMatrix>) {
        self.electrostatics = tile;
    }

    pub fn electrostatics(&self) -> Option<&BlockMatrix> {
        self.electrostatics.as_ref()
    }

    pub fn has_full_electrostatics(&self) -> bool {
        self.electrostatics.is_some()
    }

    pub fn edges(&self) -> &[CouplingEdge] {
        &self.edges
    }

    pub fn edges_of_kind(&self, kind: CouplingKind) -> impl Iterator<Item = &CouplingEdge> {
        self.edges.iter().filter(move |e| e.kind == kind)
    }

    /// Drops all edges and the electrostatic tile, keeping the block count.
    pub fn clear(&mut self) {
        self.edges.clear();
        self.electrostatics = None;
    }

    /// Every contribution needed to project the full Hessian, in a fixed order:
    /// stored edges first, then the electrostatic tile for every block pair.
    pub fn contributions(&self) -> impl Iterator<Item = Contribution<'_>> {
        let edges = self.edges.iter().map(|edge| Contribution {
            row_block: edge.from,
            column_block: edge.to,
            tile: &edge.tile,
            mirror: edge.from != edge.to,
        });
        let n = self.block_count;
        let electrostatic = self.electrostatics.iter().flat_map(move |tile| {
            (0..n).flat_map(move |row_block| {
                (0..n).map(move |column_block| Contribution {
                    row_block,
                    column_block,
                    tile,
                    mirror: false,
                })
            })
        });
        edges.chain(electrostatic)
    }
}
