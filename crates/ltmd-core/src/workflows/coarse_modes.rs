use crate::core::hessian::forces::ForceProvider;
use crate::core::hessian::source::BlockHessianSource;
use crate::core::io::problem::Problem;
use crate::core::linalg::eigen::NalgebraEigensolver;
use crate::engine::config::DiagonalizationConfig;
use crate::engine::diagonalizer::BlockHessianDiagonalizer;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::report::FailureRecord;
use crate::engine::workspace::zeroed_matrix;
use nalgebra::DMatrix;
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct CoarseModesResult {
    /// `3N × m` coarse eigenvectors, softest first.
    pub eigenvectors: DMatrix<f64>,
    pub eigenvalues: Vec<f64>,
    pub max_eigenvalue: f64,
    pub retained_per_block: Vec<usize>,
    pub sorted: bool,
    pub failures: Vec<FailureRecord>,
    pub hessian_time: Duration,
    pub rediagonalization_time: Duration,
    pub memory_footprint: usize,
}

/// Runs one coarse-eigenbasis computation over a loaded problem.
///
/// `forces` is required only when `config.numerical_hessian` is set.
#[instrument(skip_all, name = "coarse_modes_workflow")]
pub fn run<'a>(
    problem: &'a mut Problem,
    config: &DiagonalizationConfig,
    forces: Option<&'a mut dyn ForceProvider>,
    reporter: &'a ProgressReporter<'a>,
) -> Result<CoarseModesResult, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    let dimension = 3 * problem.positions.len();
    let blocks = problem.hessian.layout().len();
    let width = match config.columns_per_block {
        Some(columns) => blocks.saturating_mul(columns).min(dimension),
        None => dimension,
    };
    info!(
        atoms = problem.positions.len(),
        blocks,
        dimension,
        output_columns = width,
        "Starting coarse-mode workflow."
    );
    let mut output = zeroed_matrix(dimension, width, "eigenvector output buffer")?;
    reporter.report(Progress::PhaseFinish);

    let forwarding =
        ProgressReporter::with_callback(Box::new(move |event: Progress| reporter.report(event)));
    let mut engine = BlockHessianDiagonalizer::initialize_block(
        NalgebraEigensolver::default(),
        &mut problem.hessian,
        dimension,
        forces,
    )?
    .with_progress(forwarding);

    let summary = engine.find_eigenvectors(
        &problem.positions,
        &problem.topology,
        &mut output,
        config,
    )?;

    let retained = summary.retained.min(width);
    let result = CoarseModesResult {
        eigenvectors: output.columns(0, retained).into_owned(),
        eigenvalues: engine.eigenvalues().iter().take(retained).copied().collect(),
        max_eigenvalue: summary.max_eigenvalue,
        retained_per_block: engine
            .eigenspace()
            .map(|e| e.retained_counts())
            .unwrap_or_default(),
        sorted: summary.sorted,
        failures: engine.report().failures().to_vec(),
        hessian_time: engine.timers().hessian.elapsed(),
        rediagonalization_time: engine.timers().rediagonalization.elapsed(),
        memory_footprint: engine.memory_footprint(),
    };

    info!(
        modes = retained,
        failures = result.failures.len(),
        "Workflow complete."
    );
    Ok(result)
}
