use super::config::{DiagonalizationConfig, FailurePolicy};
use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use super::report::{DiagnosticReport, FailureStage};
use super::workspace::SortWorkspace;
use crate::core::hessian::source::{BlockHessianSource, HessianError};
use crate::core::linalg::block_matrix::BlockMatrix;
use crate::core::linalg::eigen::SymmetricEigensolver;
use crate::core::models::block::Block;
use crate::core::models::system::Topology;
use crate::core::modes::geometric::build_geometric_modes;
use crate::core::modes::orthogonalize::merge_with_numerical;
use crate::core::modes::rerank::rerank;
use nalgebra::{DMatrix, Point3};
use tracing::{debug, error, info, instrument};

/// Eigenvectors of one block, sorted by ascending `|λ|`.
///
/// `vectors` rows lie in the block's coordinates. Its columns are the
/// retained modes, anchored at the block's offset into the reduced basis,
/// so the tile composes directly with coupling tiles and the inner matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockEigenvectorSet {
    pub vectors: BlockMatrix,
    /// All block eigenvalues (or Rayleigh quotients after geometric
    /// substitution), sorted; only the first `retained` have columns.
    pub values: Vec<f64>,
    pub retained: usize,
    /// Numerical eigenvectors dropped during geometric substitution because
    /// the geometric modes already spanned them.
    pub rejected_candidates: usize,
}

impl BlockEigenvectorSet {
    /// First column of this block in the reduced basis.
    pub fn eigenvalue_offset(&self) -> usize {
        self.vectors.column_start()
    }

    pub fn retained_values(&self) -> &[f64] {
        &self.values[..self.retained]
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }
}

/// Result of diagonalizing and truncating every block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockEigenspace {
    pub sets: Vec<BlockEigenvectorSet>,
    /// Size of the reduced basis.
    pub retained_total: usize,
    /// Largest `|λ|` over all raw block eigenvalues, before truncation and
    /// before any geometric substitution.
    pub max_eigenvalue: f64,
}

impl BlockEigenspace {
    pub fn retained_counts(&self) -> Vec<usize> {
        self.sets.iter().map(|s| s.retained).collect()
    }

    /// Elements held by the retained eigenvector tiles.
    pub fn element_count(&self) -> usize {
        self.sets
            .iter()
            .map(|s| s.vectors.rows() * s.vectors.columns())
            .sum()
    }
}

/// How many modes each block keeps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Truncation {
    /// Keep modes with `|λ|` strictly below the threshold.
    Threshold(f64),
    /// Keep `blocks × columns_per_block` modes in total, chosen as the
    /// globally smallest `|λ|`.
    ColumnBudget { columns_per_block: usize },
}

impl Truncation {
    pub fn from_config(config: &DiagonalizationConfig) -> Self {
        match config.columns_per_block {
            Some(columns_per_block) => Self::ColumnBudget { columns_per_block },
            None => Self::Threshold(config.eigenvalue_threshold),
        }
    }
}

/// Computes the per-block retained counts for sorted block eigenvalues.
///
/// Under a column budget every block eigenvalue is ranked by
/// `(|λ|, block, position)` and the first `blocks × columns` are kept. Since
/// each block's values are already sorted, every block keeps a prefix, and
/// ties at the cutoff go to the lower block index. A budget at or above the
/// total number of modes keeps everything.
pub fn retained_counts(values: &[&[f64]], truncation: Truncation) -> Vec<usize> {
    match truncation {
        Truncation::Threshold(threshold) => values
            .iter()
            .map(|v| {
                v.iter()
                    .position(|x| x.abs() >= threshold)
                    .unwrap_or(v.len())
            })
            .collect(),
        Truncation::ColumnBudget { columns_per_block } => {
            let total: usize = values.iter().map(|v| v.len()).sum();
            let budget = values.len().saturating_mul(columns_per_block);
            if budget >= total {
                return values.iter().map(|v| v.len()).collect();
            }

            let mut ranked: Vec<(f64, usize, usize)> = values
                .iter()
                .enumerate()
                .flat_map(|(block, v)| {
                    v.iter()
                        .enumerate()
                        .map(move |(position, x)| (x.abs(), block, position))
                })
                .collect();
            ranked.sort_by(|a, b| {
                a.0.total_cmp(&b.0)
                    .then(a.1.cmp(&b.1))
                    .then(a.2.cmp(&b.2))
            });

            let mut counts = vec![0; values.len()];
            for &(_, block, _) in &ranked[..budget] {
                counts[block] += 1;
            }
            counts
        }
    }
}

/// Diagonalizes every block tile of a [`BlockHessianSource`] and truncates the
/// result into a [`BlockEigenspace`].
pub struct BlockEigenspaceBuilder<'e, S: SymmetricEigensolver> {
    solver: &'e S,
    config: &'e DiagonalizationConfig,
    workspace: &'e mut SortWorkspace,
    report: &'e mut DiagnosticReport,
    reporter: &'e ProgressReporter<'e>,
}

impl<'e, S: SymmetricEigensolver> BlockEigenspaceBuilder<'e, S> {
    pub fn new(
        solver: &'e S,
        config: &'e DiagonalizationConfig,
        workspace: &'e mut SortWorkspace,
        report: &'e mut DiagnosticReport,
        reporter: &'e ProgressReporter<'e>,
    ) -> Self {
        Self {
            solver,
            config,
            workspace,
            report,
            reporter,
        }
    }

    #[instrument(skip_all, name = "block_eigenspace")]
    pub fn build(
        &mut self,
        source: &dyn BlockHessianSource,
        positions: &[Point3<f64>],
        topology: &Topology,
    ) -> Result<BlockEigenspace, EngineError> {
        let layout = source.layout();
        self.reporter.report(Progress::PhaseStart {
            name: "Block Diagonalization",
        });
        self.reporter.report(Progress::TaskStart {
            total_steps: layout.len() as u64,
        });

        let mut sets = Vec::with_capacity(layout.len());
        let mut max_eigenvalue = 0.0f64;
        for (index, block) in layout.blocks().iter().enumerate() {
            let tile = source
                .block_tile(index)
                .ok_or(HessianError::BlockOutOfRange {
                    block: index,
                    count: layout.len(),
                })?;
            let (set, raw_max) = self.diagonalize_block(index, block, tile, positions, topology)?;
            max_eigenvalue = max_eigenvalue.max(raw_max);
            sets.push(set);
            self.reporter.report(Progress::TaskIncrement);
        }
        self.reporter.report(Progress::TaskFinish);

        let truncation = Truncation::from_config(self.config);
        let values: Vec<&[f64]> = sets.iter().map(|s| s.values.as_slice()).collect();
        let counts = retained_counts(&values, truncation);

        let mut offset = 0;
        for (index, (set, retained)) in sets.iter_mut().zip(counts).enumerate() {
            set.retained = retained;
            set.vectors.column_resize(retained);
            let row_start = set.vectors.row_start();
            set.vectors.block_move(row_start, offset);
            offset += retained;
            debug!(block = index, retained, "Block modes retained.");
        }

        let eigenspace = BlockEigenspace {
            sets,
            retained_total: offset,
            max_eigenvalue,
        };
        let blocks = layout.len();
        let average = if blocks > 0 {
            offset as f64 / blocks as f64
        } else {
            0.0
        };
        debug!(
            average_modes = average,
            blocks, "Average retained modes per block."
        );
        info!(
            blocks,
            retained = offset,
            max_eigenvalue,
            ?truncation,
            "Block eigenspace built."
        );
        self.reporter.report(Progress::PhaseFinish);
        Ok(eigenspace)
    }

    /// Returns the block's eigenvector set and its largest raw `|λ|`.
    fn diagonalize_block(
        &mut self,
        index: usize,
        block: &Block,
        tile: &BlockMatrix,
        positions: &[Point3<f64>],
        topology: &Topology,
    ) -> Result<(BlockEigenvectorSet, f64), EngineError> {
        let hessian = tile.data();
        let (mut values, mut vectors) = match self.solver.decompose(hessian) {
            Ok(decomposition) => (decomposition.values, decomposition.vectors),
            Err(source) => match self.config.failure_policy {
                FailurePolicy::Strict => {
                    return Err(EngineError::BlockDiagonalization {
                        block: index,
                        source,
                    });
                }
                FailurePolicy::BestEffort => {
                    error!(block = index, "Block diagonalization failed: {source}");
                    self.report.record(FailureStage::Block(index), source);
                    let dim = hessian.nrows();
                    (
                        hessian.diagonal().iter().copied().collect(),
                        DMatrix::identity(dim, dim),
                    )
                }
            },
        };
        self.workspace.sort(&mut values, &mut vectors)?;
        let raw_max = values.iter().map(|v| v.abs()).fold(0.0, f64::max);
        let mut rejected_candidates = 0;

        if self.config.geometric_modes {
            let modes = build_geometric_modes(block, positions, topology)
                .map_err(|source| EngineError::GeometricModes {
                    block: index,
                    source,
                })?;
            let merged = merge_with_numerical(&modes, &vectors, self.config.residual_threshold);
            rejected_candidates = merged.rejected.len();
            if rejected_candidates > 0 {
                debug!(
                    block = index,
                    rejected = rejected_candidates,
                    "Residual vectors with low norm skipped."
                );
            }
            let ranked = rerank(merged, hessian)?;
            values = ranked.values;
            vectors = ranked.vectors;
        }

        let set = BlockEigenvectorSet {
            vectors: BlockMatrix::from_matrix(block.coordinate_start(), 0, vectors),
            retained: values.len(),
            values,
            rejected_candidates,
        };
        Ok((set, raw_max))
    }
}
