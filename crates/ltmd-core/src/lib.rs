//! # LTMD Core Library
//!
//! Coarse eigenbasis construction for long-timestep molecular dynamics, built
//! on the block Hessian approximation: diagonalize each residue block, keep its
//! softest modes, project the coupled Hessian onto that basis and solve the
//! small dense problem that remains.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture to keep concerns
//! separate and every piece testable in isolation.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Topology`,
//!   `BlockLayout`), block-addressed linear algebra (`BlockMatrix`, the
//!   eigensolver boundary, `stable_abs_sort`), the collaborator traits for
//!   the block Hessian and forces, geometric modes, and I/O utilities.
//!
//! - **[`engine`]: The Logic Core.** The stateful `BlockHessianDiagonalizer`
//!   with its configuration, reusable workspaces, timers, failure reports and
//!   diagnostics. Each call rebuilds the block eigenspace, the inner matrix and
//!   the reduced solution.
//!
//! - **[`workflows`]: The Public API.** One-shot procedures that tie `core`
//!   and `engine` together, such as computing the coarse modes of a problem
//!   file.

pub mod core;
pub mod engine;
pub mod workflows;
