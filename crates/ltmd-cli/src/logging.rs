use crate::error::{CliError, Result};
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::{
    Layer,
    filter::{LevelFilter, Targets},
    fmt,
    prelude::*,
};

/// Crates whose events are shown at the requested verbosity. Everything else
/// is capped at WARN.
const ENGINE_TARGETS: [&str; 2] = ["ltmd", "ltmd_cli"];

/// Per-block retention and residual rejections are logged at DEBUG, so the
/// log file never records less than that.
const LOG_FILE_FLOOR: LevelFilter = LevelFilter::DEBUG;

fn console_level(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn engine_filter(level: LevelFilter) -> Targets {
    ENGINE_TARGETS
        .iter()
        .fold(Targets::new(), |targets, name| targets.with_target(*name, level))
        .with_default(level.min(LevelFilter::WARN))
}

pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<PathBuf>) -> Result<()> {
    let level = console_level(verbosity, quiet);
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(engine_filter(level));

    let file = match log_file {
        Some(path) => {
            let sink = File::create(&path).map_err(CliError::Io)?;
            let layer = fmt::layer()
                .with_writer(sink)
                .with_ansi(false)
                .with_thread_ids(true)
                .with_filter(engine_filter(level.max(LOG_FILE_FLOOR)));
            Some(layer)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| CliError::Other(anyhow::anyhow!("Failed to install logger: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tracing::{debug, info, trace};

    #[test]
    fn verbosity_flags_map_to_console_level() {
        assert_eq!(console_level(0, false), LevelFilter::WARN);
        assert_eq!(console_level(1, false), LevelFilter::INFO);
        assert_eq!(console_level(2, false), LevelFilter::DEBUG);
        assert_eq!(console_level(7, false), LevelFilter::TRACE);
        assert_eq!(console_level(3, true), LevelFilter::ERROR);
    }

    #[test]
    fn engine_targets_follow_verbosity_while_others_stay_at_warn() {
        let filter = engine_filter(LevelFilter::TRACE);
        assert!(filter.would_enable("ltmd::engine::block_eigenspace", &tracing::Level::TRACE));
        assert!(filter.would_enable("ltmd_cli::commands", &tracing::Level::DEBUG));
        assert!(!filter.would_enable("indicatif", &tracing::Level::INFO));
        assert!(filter.would_enable("indicatif", &tracing::Level::WARN));
    }

    #[test]
    fn quiet_filter_hides_engine_info() {
        let filter = engine_filter(console_level(0, true));
        assert!(!filter.would_enable("ltmd::engine::diagonalizer", &tracing::Level::INFO));
        assert!(filter.would_enable("ltmd::engine::diagonalizer", &tracing::Level::ERROR));
    }

    #[test]
    #[serial]
    fn log_file_keeps_block_detail_below_console_level() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("ltmd.log");
        let sink = File::create(&log_path).unwrap();
        let layer = fmt::layer()
            .with_writer(sink)
            .with_ansi(false)
            .with_filter(engine_filter(console_level(0, false).max(LOG_FILE_FLOOR)));
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            debug!(target: "ltmd::engine::block_eigenspace", block = 0, retained = 6, "Block modes retained.");
            trace!(target: "ltmd::core::modes::orthogonalize", "Residual vector norm is low, skipping.");
            info!(target: "other_crate", "Unrelated chatter.");
        });

        let content = std::fs::read_to_string(log_path).unwrap();
        assert!(content.contains("Block modes retained."));
        assert!(content.contains("retained=6"));
        assert!(!content.contains("Residual vector norm"));
        assert!(!content.contains("Unrelated chatter."));
    }

    #[test]
    #[serial]
    fn unwritable_log_file_is_an_io_error() {
        let directory = tempfile::tempdir().unwrap();
        let result = setup_logging(0, false, Some(directory.path().to_path_buf()));
        assert!(matches!(result, Err(CliError::Io(_))));
    }
}
