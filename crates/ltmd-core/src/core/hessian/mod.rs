//! # Hessian Collaborators
//!
//! Boundaries to the parts of the simulation that own the Hessian: the block
//! Hessian with its coupling graph ([`source`], [`coupling`]) and the
//! integrator's force recomputation ([`forces`]) used by the finite-difference
//! path. Building tiles from a force field is outside this crate; the bundled
//! [`source::PrecomputedBlockHessian`] serves tiles assembled elsewhere.

pub mod coupling;
pub mod forces;
pub mod source;
