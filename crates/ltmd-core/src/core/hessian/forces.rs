use nalgebra::{Point3, Vector3};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ForceError {
    #[error("Force evaluation failed: {0}")]
    Evaluation(String),
    #[error("Force provider returned {found} forces for {expected} atoms")]
    WrongLength { expected: usize, found: usize },
}

/// Force recomputation capability supplied by the calling integrator.
///
/// Used only by the finite-difference inner-matrix path. Implementations must
/// be pure with respect to `positions`: calling twice with the same positions
/// must return the same forces, and any integrator state touched during the
/// call (e.g. simulation time) is the implementation's to restore.
pub trait ForceProvider {
    fn calculate_forces(&mut self, positions: &[Point3<f64>]) -> Result<Vec<Vector3<f64>>, ForceError>;
}

impl<F> ForceProvider for F
where
    F: FnMut(&[Point3<f64>]) -> Result<Vec<Vector3<f64>>, ForceError>,
{
    fn calculate_forces(&mut self, positions: &[Point3<f64>]) -> Result<Vec<Vector3<f64>>, ForceError> {
        self(positions)
    }
}
