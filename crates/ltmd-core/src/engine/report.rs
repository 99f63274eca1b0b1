use crate::core::linalg::eigen::EigenError;
use std::fmt;

/// The eigensolve that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Block(usize),
    Reduced,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block(block) => write!(f, "block {block}"),
            Self::Reduced => f.write_str("reduced matrix"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailureRecord {
    pub stage: FailureStage,
    pub error: EigenError,
}

/// Failures tolerated under best-effort mode during the most recent call.
///
/// Cleared at the start of every `find_eigenvectors`. Output produced while
/// this report is non-empty contains fallback vectors and must not be
/// trusted without checking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagnosticReport {
    failures: Vec<FailureRecord>,
}

impl DiagnosticReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stage: FailureStage, error: EigenError) {
        self.failures.push(FailureRecord { stage, error });
    }

    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn clear(&mut self) {
        self.failures.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_clear_track_failures() {
        let mut report = DiagnosticReport::new();
        assert!(report.is_clean());
        report.record(FailureStage::Block(2), EigenError::NoConvergence { dimension: 6 });
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].stage.to_string(), "block 2");
        report.clear();
        assert!(report.is_clean());
    }
}
