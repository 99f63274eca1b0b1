//! Dense linear algebra primitives shared by the engine: block-addressed
//! tiles, the symmetric eigensolver boundary, deterministic eigenpair ordering
//! and reusable scratch storage.

pub mod block_matrix;
pub mod eigen;
pub mod scratch;
pub mod sort;
