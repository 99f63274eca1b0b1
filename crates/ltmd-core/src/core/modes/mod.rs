//! Coarse-grained block modes.
//!
//! Geometric substitution runs as three explicit stages: [`geometric`] builds
//! the rigid-body and hinge vectors of a block, [`orthogonalize`] merges them
//! with the block's numerical eigenvectors, and [`rerank`] re-estimates and
//! re-sorts the merged columns against the block Hessian.

pub mod geometric;
pub mod orthogonalize;
pub mod rerank;
