use crate::core::io::triples;
use crate::core::linalg::block_matrix::BlockMatrix;
use nalgebra::DMatrix;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Plain-text artifacts the engine can dump for offline inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// The projected inner matrix, written to `eigM`.
    InnerMatrix,
    /// Sorted reduced eigenvalues, written to `eigRed`.
    Eigenvalues,
    /// Every block Hessian tile in global coordinates, written to `blockH`.
    BlockHessian,
}

impl DiagnosticKind {
    /// Maps the integer selector used by integrators (0, 1, 2).
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::InnerMatrix),
            1 => Some(Self::Eigenvalues),
            2 => Some(Self::BlockHessian),
            _ => None,
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Self::InnerMatrix => "eigM",
            Self::Eigenvalues => "eigRed",
            Self::BlockHessian => "blockH",
        }
    }
}

/// Data backing one artifact.
#[derive(Debug, Clone, Copy)]
pub enum DiagnosticData<'a> {
    InnerMatrix(&'a DMatrix<f64>),
    Eigenvalues(&'a [f64]),
    BlockHessian(&'a [&'a BlockMatrix]),
}

impl DiagnosticData<'_> {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Self::InnerMatrix(_) => DiagnosticKind::InnerMatrix,
            Self::Eigenvalues(_) => DiagnosticKind::Eigenvalues,
            Self::BlockHessian(_) => DiagnosticKind::BlockHessian,
        }
    }
}

/// Writes one artifact into `directory`, replacing any previous file.
pub fn write_artifact(directory: &Path, data: DiagnosticData<'_>) -> io::Result<PathBuf> {
    let path = directory.join(data.kind().file_name());
    let mut out = BufWriter::new(File::create(&path)?);
    match data {
        DiagnosticData::InnerMatrix(matrix) => triples::write_matrix(&mut out, matrix)?,
        DiagnosticData::Eigenvalues(values) => triples::write_eigenvalues(&mut out, values)?,
        DiagnosticData::BlockHessian(tiles) => {
            for tile in tiles {
                triples::write_block(&mut out, tile)?;
            }
        }
    }
    out.flush()?;
    debug!(path = %path.display(), "Diagnostic artifact written.");
    Ok(path)
}

/// Like [`write_artifact`], but a failure is only logged.
pub(crate) fn write_artifact_or_warn(directory: &Path, data: DiagnosticData<'_>) {
    if let Err(e) = write_artifact(directory, data) {
        warn!(
            kind = ?data.kind(),
            directory = %directory.display(),
            "Failed to write diagnostic artifact: {e}"
        );
    }
}
