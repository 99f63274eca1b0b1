use super::block_eigenspace::{BlockEigenspace, BlockEigenspaceBuilder};
use super::config::DiagonalizationConfig;
use super::diagnostics::{self, DiagnosticData, DiagnosticKind};
use super::error::EngineError;
use super::inner_hessian::assemble_inner_hessian;
use super::numerical::assemble_numerical_inner_hessian;
use super::progress::{Progress, ProgressReporter};
use super::reduced::{expand_into, solve_reduced};
use super::report::DiagnosticReport;
use super::timers::EngineTimers;
use super::workspace::SortWorkspace;
use crate::core::hessian::forces::ForceProvider;
use crate::core::hessian::source::BlockHessianSource;
use crate::core::linalg::block_matrix::BlockMatrix;
use crate::core::linalg::eigen::{EigenDecomposition, NalgebraEigensolver, SymmetricEigensolver};
use crate::core::models::system::Topology;
use nalgebra::{DMatrix, Point3};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Outcome of one [`BlockHessianDiagonalizer::find_eigenvectors`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct EigenvectorSummary {
    /// Largest `|λ|` among all block eigenvalues, for step-size heuristics.
    pub max_eigenvalue: f64,
    /// Number of coarse modes (the reduced dimension).
    pub retained: usize,
    /// Whether the reduced eigenpairs are ordered; false only after a
    /// best-effort recovery from a failed reduced solve.
    pub sorted: bool,
}

struct BlockCollaborators<'a> {
    hessian: &'a mut dyn BlockHessianSource,
    forces: Option<&'a mut dyn ForceProvider>,
}

/// Coarse eigenbasis engine for a block-structured Hessian.
///
/// In block mode the engine borrows the block Hessian collaborator and,
/// optionally, a force provider for the finite-difference path; it never owns
/// either. In full mode it only offers dense diagonalization. All scratch
/// storage is owned by the engine and rebuilt by every call, so one engine
/// must not be shared between simulations running concurrently.
pub struct BlockHessianDiagonalizer<'a, S: SymmetricEigensolver = NalgebraEigensolver> {
    solver: S,
    dimension: usize,
    collaborators: Option<BlockCollaborators<'a>>,
    eigenspace: Option<BlockEigenspace>,
    inner: DMatrix<f64>,
    eigenvalues: Vec<f64>,
    workspace: SortWorkspace,
    timers: EngineTimers,
    report: DiagnosticReport,
    reporter: ProgressReporter<'a>,
}

impl<'a, S: SymmetricEigensolver> BlockHessianDiagonalizer<'a, S> {
    /// Block mode: coarse eigenvectors of `hessian`, whose layout must span
    /// `dimension` Cartesian coordinates.
    pub fn initialize_block(
        solver: S,
        hessian: &'a mut dyn BlockHessianSource,
        dimension: usize,
        forces: Option<&'a mut dyn ForceProvider>,
    ) -> Result<Self, EngineError> {
        let layout_dimension = hessian.layout().dimension();
        let largest_block = hessian.layout().max_block_dimension();
        if layout_dimension != dimension {
            return Err(EngineError::DimensionMismatch {
                context: "block Hessian layout",
                expected: dimension,
                found: layout_dimension,
            });
        }
        let mut engine = Self::initialize_full(solver, dimension)?;
        engine.collaborators = Some(BlockCollaborators { hessian, forces });
        info!(
            dimension,
            blocks = engine.block_count(),
            largest_block,
            "Block diagonalizer initialized."
        );
        Ok(engine)
    }

    /// Full mode: dense diagonalization of `dimension × dimension` matrices only.
    pub fn initialize_full(solver: S, dimension: usize) -> Result<Self, EngineError> {
        if !solver.is_available() {
            return Err(EngineError::SolverUnavailable);
        }
        let mut workspace = SortWorkspace::new();
        workspace.reserve(dimension)?;
        Ok(Self {
            solver,
            dimension,
            collaborators: None,
            eigenspace: None,
            inner: DMatrix::zeros(0, 0),
            eigenvalues: Vec::new(),
            workspace,
            timers: EngineTimers::default(),
            report: DiagnosticReport::new(),
            reporter: ProgressReporter::new(),
        })
    }

    pub fn with_progress(mut self, reporter: ProgressReporter<'a>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn is_block_mode(&self) -> bool {
        self.collaborators.is_some()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn block_count(&self) -> usize {
        self.collaborators
            .as_ref()
            .map_or(0, |c| c.hessian.layout().len())
    }

    /// Computes the coarse eigenvectors at `positions` and writes them into
    /// `output` (`3N` rows, column-major, softest mode first).
    ///
    /// Output columns beyond the number of coarse modes are zero-filled.
    #[instrument(skip_all, name = "find_eigenvectors")]
    pub fn find_eigenvectors(
        &mut self,
        positions: &[Point3<f64>],
        topology: &Topology,
        output: &mut DMatrix<f64>,
        config: &DiagonalizationConfig,
    ) -> Result<EigenvectorSummary, EngineError> {
        let collaborators = self
            .collaborators
            .as_mut()
            .ok_or(EngineError::NotBlockMode)?;
        config.validate()?;
        check_dimension("positions", self.dimension, 3 * positions.len())?;
        check_dimension("output buffer", self.dimension, output.nrows())?;
        if config.numerical_hessian && collaborators.forces.is_none() {
            return Err(EngineError::MissingForceProvider);
        }
        self.report.clear();
        self.eigenspace = None;

        self.timers.hessian.start();
        let evaluated = collaborators
            .hessian
            .evaluate_blocks(positions, topology, config.numerical_hessian);
        self.timers.hessian.stop();
        evaluated?;

        if let Some(diag) = config.diagnostics.as_ref() {
            if diag.includes(DiagnosticKind::BlockHessian) {
                let tiles = block_tiles(&*collaborators.hessian);
                diagnostics::write_artifact_or_warn(
                    &diag.directory,
                    DiagnosticData::BlockHessian(&tiles),
                );
            }
        }

        self.timers.rediagonalization.start();
        let built = BlockEigenspaceBuilder::new(
            &self.solver,
            config,
            &mut self.workspace,
            &mut self.report,
            &self.reporter,
        )
        .build(&*collaborators.hessian, positions, topology);
        self.timers.rediagonalization.stop();
        let eigenspace = built?;

        self.reporter.report(Progress::PhaseStart {
            name: "Inner Matrix",
        });
        self.timers.hessian.start();
        let assembled = if config.numerical_hessian {
            match collaborators.forces.as_deref_mut() {
                Some(forces) => assemble_numerical_inner_hessian(
                    forces,
                    positions,
                    &eigenspace,
                    config.finite_difference_epsilon,
                    &self.reporter,
                ),
                None => Err(EngineError::MissingForceProvider),
            }
        } else {
            collaborators
                .hessian
                .evaluate_coupling(config.block_cutoff, positions, topology)
                .map_err(EngineError::from)
                .and_then(|()| assemble_inner_hessian(collaborators.hessian.coupling(), &eigenspace))
        };
        self.timers.hessian.stop();
        self.inner = assembled?;
        self.reporter.report(Progress::PhaseFinish);

        if let Some(diag) = config.diagnostics.as_ref() {
            if diag.includes(DiagnosticKind::InnerMatrix) {
                diagnostics::write_artifact_or_warn(
                    &diag.directory,
                    DiagnosticData::InnerMatrix(&self.inner),
                );
            }
        }

        self.reporter.report(Progress::PhaseStart {
            name: "Reduced Diagonalization",
        });
        self.timers.rediagonalization.start();
        let solved = solve_reduced(
            &self.solver,
            &self.inner,
            config.failure_policy,
            &mut self.workspace,
            &mut self.report,
        );
        self.timers.rediagonalization.stop();
        let solution = solved?;
        self.reporter.report(Progress::PhaseFinish);

        if let Some(diag) = config.diagnostics.as_ref() {
            if diag.includes(DiagnosticKind::Eigenvalues) {
                diagnostics::write_artifact_or_warn(
                    &diag.directory,
                    DiagnosticData::Eigenvalues(&solution.values),
                );
            }
        }

        expand_into(&eigenspace, &solution.vectors, output)?;

        let summary = EigenvectorSummary {
            max_eigenvalue: eigenspace.max_eigenvalue,
            retained: eigenspace.retained_total,
            sorted: solution.sorted,
        };
        self.eigenvalues = solution.values;
        self.eigenspace = Some(eigenspace);

        info!(
            retained = summary.retained,
            max_eigenvalue = summary.max_eigenvalue,
            failures = self.report.failures().len(),
            "Coarse eigenvectors found."
        );
        Ok(summary)
    }

    /// Diagonalizes a dense symmetric matrix of the engine's dimension and
    /// returns its eigenpairs ordered by ascending `|λ|`.
    pub fn diagonalize_dense(
        &mut self,
        matrix: &DMatrix<f64>,
    ) -> Result<EigenDecomposition, EngineError> {
        check_dimension("dense matrix", self.dimension, matrix.nrows())?;
        self.timers.rediagonalization.start();
        let decomposed = self.solver.decompose(matrix);
        self.timers.rediagonalization.stop();
        let mut decomposition =
            decomposed.map_err(|source| EngineError::DenseDiagonalization { source })?;
        self.workspace
            .sort(&mut decomposition.values, &mut decomposition.vectors)?;
        self.eigenvalues = decomposition.values.clone();
        Ok(decomposition)
    }

    /// Writes one diagnostic artifact from the state of the most recent call.
    pub fn dump_diagnostics(&self, kind: DiagnosticKind, directory: &Path) -> io::Result<PathBuf> {
        match kind {
            DiagnosticKind::InnerMatrix => {
                diagnostics::write_artifact(directory, DiagnosticData::InnerMatrix(&self.inner))
            }
            DiagnosticKind::Eigenvalues => {
                diagnostics::write_artifact(directory, DiagnosticData::Eigenvalues(&self.eigenvalues))
            }
            DiagnosticKind::BlockHessian => {
                let tiles = self
                    .collaborators
                    .as_ref()
                    .map(|c| block_tiles(&*c.hessian))
                    .unwrap_or_default();
                diagnostics::write_artifact(directory, DiagnosticData::BlockHessian(&tiles))
            }
        }
    }

    /// Block eigenvectors and retained counts of the most recent call.
    pub fn eigenspace(&self) -> Option<&BlockEigenspace> {
        self.eigenspace.as_ref()
    }

    pub fn inner_matrix(&self) -> &DMatrix<f64> {
        &self.inner
    }

    /// Eigenvalues of the most recent reduced or dense solve.
    pub fn eigenvalues(&self) -> &[f64] {
        &self.eigenvalues
    }

    pub fn report(&self) -> &DiagnosticReport {
        &self.report
    }

    pub fn timers(&self) -> &EngineTimers {
        &self.timers
    }

    pub fn reset_timers(&mut self) {
        self.timers.reset();
    }

    /// Matrix elements held by the engine: retained block eigenvector tiles,
    /// the inner matrix and the eigenpair scratch arrays.
    pub fn memory_footprint(&self) -> usize {
        self.eigenspace
            .as_ref()
            .map_or(0, BlockEigenspace::element_count)
            + self.inner.len()
            + self.workspace.capacity()
    }
}

fn block_tiles(hessian: &dyn BlockHessianSource) -> Vec<&BlockMatrix> {
    (0..hessian.layout().len())
        .filter_map(|b| hessian.block_tile(b))
        .collect()
}

fn check_dimension(context: &'static str, expected: usize, found: usize) -> Result<(), EngineError> {
    if expected != found {
        return Err(EngineError::DimensionMismatch {
            context,
            expected,
            found,
        });
    }
    Ok(())
}
