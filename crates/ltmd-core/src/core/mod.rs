//! # Core Module
//!
//! Stateless building blocks of the coarse-eigenbasis engine.
//!
//! ## Overview
//!
//! Everything here is free of engine state: data describing the caller's
//! system, dense linear algebra on block-addressed tiles, the boundaries to
//! the collaborators that own the Hessian and the forces, and the analytic
//! construction of geometric modes. The [`crate::engine`] layer composes these
//! pieces into repeated diagonalization calls.
//!
//! ## Architecture
//!
//! - **Linear Algebra** ([`linalg`]) - `BlockMatrix` tiles, the symmetric eigensolver boundary,
//!   stable ordering by absolute eigenvalue, reusable scratch buffers
//! - **System Description** ([`models`]) - Atom masses, residue backbone descriptors, block layout
//! - **Collaborators** ([`hessian`]) - Block Hessian source, coupling graph, force provider
//! - **Geometric Modes** ([`modes`]) - Rigid-body and hinge modes, merging and re-ranking
//! - **File I/O** ([`io`]) - TOML problem files and triple-format writers

pub mod hessian;
pub mod io;
pub mod linalg;
pub mod models;
pub mod modes;
