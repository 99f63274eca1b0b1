use crate::cli::DiagonalizeArgs;
use crate::config::PartialDiagonalizationConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::{CliProgressHandler, PhaseTiming};
use ltmd::core::io::problem::Problem;
use ltmd::core::io::triples;
use ltmd::engine::progress::ProgressReporter;
use ltmd::workflows::{self, coarse_modes::CoarseModesResult};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

const SUMMARY_EIGENVALUES: usize = 10;

pub fn run(args: DiagonalizeArgs) -> Result<()> {
    let partial_config = match &args.config {
        Some(path) => PartialDiagonalizationConfig::from_file(path)?,
        None => PartialDiagonalizationConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(&args)?;

    if let Some(diagnostics) = &config.diagnostics {
        std::fs::create_dir_all(&diagnostics.directory)?;
    }

    info!("Loading problem from {:?}", &args.input);
    let mut problem = Problem::load(&args.input)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Starting block Hessian diagonalization...");
    info!("Invoking the coarse-mode workflow...");
    let result = workflows::coarse_modes::run(&mut problem, &config, None, &reporter)?;

    write_modes(&args.output, &result)?;
    print_summary(&result, &args.output, &progress_handler.phase_timings());
    Ok(())
}

fn write_modes(path: &Path, result: &CoarseModesResult) -> Result<()> {
    info!("Writing {} coarse modes to {:?}", result.eigenvectors.ncols(), path);
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    triples::write_matrix(&mut out, &result.eigenvectors)
        .and_then(|()| out.flush())
        .map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
}

fn print_summary(result: &CoarseModesResult, output: &Path, phases: &[PhaseTiming]) {
    let modes = result.eigenvectors.ncols();
    println!(
        "✓ {} coarse modes ({} coordinates) written to: {}",
        modes,
        result.eigenvectors.nrows(),
        output.display()
    );
    println!("  Retained per block: {:?}", result.retained_per_block);
    println!("  Largest block |eigenvalue|: {:.6e}", result.max_eigenvalue);

    let shown = modes.min(SUMMARY_EIGENVALUES);
    for (i, value) in result.eigenvalues.iter().take(shown).enumerate() {
        println!("  λ[{:>3}] = {:>16.8e}", i + 1, value);
    }
    if modes > shown {
        println!("  ... {} more", modes - shown);
    }
    println!(
        "  Hessian time: {:.3}s, rediagonalization time: {:.3}s, footprint: {} elements",
        result.hessian_time.as_secs_f64(),
        result.rediagonalization_time.as_secs_f64(),
        result.memory_footprint
    );
    for phase in phases {
        println!("  {:<24} {:.3}s", phase.name, phase.elapsed.as_secs_f64());
    }

    if !result.sorted {
        warn!("Reduced eigenpairs are not ordered; the reduced solve failed.");
        println!("Warning: reduced eigenpairs are unordered after a solver failure.");
    }
    for failure in &result.failures {
        warn!(stage = %failure.stage, "Recovered from solver failure: {}", failure.error);
        println!("Warning: {} diagonalization failed: {}", failure.stage, failure.error);
    }
}
